//! FFI bindings for Stairs Resim
//!
//! This module provides C-compatible functions so a viewer host can drive
//! re-simulation directly. All functions use C strings (null-terminated) and
//! return allocated memory that must be freed by the caller using
//! `resim_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::error::SimulationError;
use crate::params::SimulationParams;
use crate::pipeline::{compare_parameters, simulate, Simulator};
use crate::source::FrameSource;

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Set the last error message
fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clear the last error message
fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Hand a JSON result to the caller, or record the error and return NULL
fn json_result_to_cstr(result: Result<String, SimulationError>) -> *mut c_char {
    match result {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Read a params JSON pointer; NULL means defaults
unsafe fn params_from_ptr(json: *const c_char) -> Result<SimulationParams, SimulationError> {
    if json.is_null() {
        return Ok(SimulationParams::default());
    }
    match cstr_to_string(json) {
        Some(s) => SimulationParams::from_json(&s),
        None => Err(SimulationError::ParseError(
            "Invalid params string pointer".to_string(),
        )),
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Re-simulate a JSON array of frame records and return the run as JSON.
///
/// # Safety
/// - `frames_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `resim_free_string`.
/// - Returns NULL on error; call `resim_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn resim_simulate_json(
    frames_json: *const c_char,
    phone_threshold: f64,
    debounce_duration_sec: f64,
    fps: u32,
) -> *mut c_char {
    clear_last_error();

    let json_str = match cstr_to_string(frames_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid frames string pointer");
            return ptr::null_mut();
        }
    };

    let params = SimulationParams::new(phone_threshold, debounce_duration_sec).with_fps(fps);

    json_result_to_cstr(
        FrameSource::parse_array(&json_str)
            .and_then(|frames| simulate(&frames, &params))
            .and_then(|run| serde_json::to_string(&run).map_err(SimulationError::from)),
    )
}

/// Compare two parameter sets over a JSON array of frame records.
///
/// # Safety
/// - `frames_json` must be a valid null-terminated C string.
/// - `baseline_params_json` and `tuned_params_json` must be valid
///   null-terminated C strings or NULL (NULL selects the defaults).
/// - Returns a newly allocated string that must be freed with `resim_free_string`.
/// - Returns NULL on error; call `resim_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn resim_compare_json(
    frames_json: *const c_char,
    baseline_params_json: *const c_char,
    tuned_params_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let json_str = match cstr_to_string(frames_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid frames string pointer");
            return ptr::null_mut();
        }
    };

    let result = params_from_ptr(baseline_params_json).and_then(|baseline| {
        let tuned = params_from_ptr(tuned_params_json)?;
        let frames = FrameSource::parse_array(&json_str)?;
        let comparison = compare_parameters(&frames, &baseline, &tuned)?;
        Ok(serde_json::to_string(&comparison)?)
    });

    json_result_to_cstr(result)
}

// ============================================================================
// Stateful Simulator API
// ============================================================================

/// Opaque handle to a Simulator
pub struct SimulatorHandle {
    simulator: Simulator,
}

/// Create a Simulator bound to a JSON array of frame records.
///
/// # Safety
/// - `frames_json` must be a valid null-terminated C string.
/// - Must be freed with `resim_simulator_free`.
/// - Returns NULL on error; call `resim_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn resim_simulator_new(frames_json: *const c_char) -> *mut SimulatorHandle {
    clear_last_error();

    let json_str = match cstr_to_string(frames_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid frames string pointer");
            return ptr::null_mut();
        }
    };

    match Simulator::from_json(&json_str) {
        Ok(simulator) => Box::into_raw(Box::new(SimulatorHandle { simulator })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free a Simulator.
///
/// # Safety
/// - `simulator` must be a valid pointer returned by `resim_simulator_new`.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn resim_simulator_free(simulator: *mut SimulatorHandle) {
    if !simulator.is_null() {
        drop(Box::from_raw(simulator));
    }
}

/// Run (or fetch the memoized run for) a parameter set.
///
/// # Safety
/// - `simulator` must be a valid pointer returned by `resim_simulator_new`.
/// - Returns a newly allocated string that must be freed with `resim_free_string`.
/// - Returns NULL on error; call `resim_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn resim_simulator_run(
    simulator: *mut SimulatorHandle,
    phone_threshold: f64,
    debounce_duration_sec: f64,
    fps: u32,
) -> *mut c_char {
    clear_last_error();

    if simulator.is_null() {
        set_last_error("Null simulator pointer");
        return ptr::null_mut();
    }

    let handle = &mut *simulator;
    let params = SimulationParams::new(phone_threshold, debounce_duration_sec).with_fps(fps);

    json_result_to_cstr(
        handle
            .simulator
            .run(&params)
            .and_then(|run| serde_json::to_string(run).map_err(SimulationError::from)),
    )
}

/// Compare two parameter sets with a stateful simulator.
///
/// # Safety
/// - `simulator` must be a valid pointer returned by `resim_simulator_new`.
/// - `baseline_params_json` and `tuned_params_json` must be valid
///   null-terminated C strings or NULL (NULL selects the defaults).
/// - Returns a newly allocated string that must be freed with `resim_free_string`.
/// - Returns NULL on error; call `resim_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn resim_simulator_compare(
    simulator: *mut SimulatorHandle,
    baseline_params_json: *const c_char,
    tuned_params_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if simulator.is_null() {
        set_last_error("Null simulator pointer");
        return ptr::null_mut();
    }

    let handle = &mut *simulator;

    let result = params_from_ptr(baseline_params_json).and_then(|baseline| {
        let tuned = params_from_ptr(tuned_params_json)?;
        let comparison = handle.simulator.compare(&baseline, &tuned)?;
        Ok(serde_json::to_string(&comparison)?)
    });

    json_result_to_cstr(result)
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by Resim functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a Resim function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn resim_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next Resim function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn resim_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

/// Get the Resim library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn resim_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    /// 3 non-compliant frames, then 3 compliant frames with a phone user
    fn sample_frames_json() -> CString {
        let frames: Vec<serde_json::Value> = (0..6)
            .map(|i| {
                let compliant = i >= 3;
                serde_json::json!({
                    "frame_number": i,
                    "timestamp_sec": i as f64 / 24.0,
                    "metrics": {"total_persons": 1, "compliant_count": 0, "non_compliant_count": 1, "phone_count": 0},
                    "persons": [{
                        "person_id": 0,
                        "rail_hit_test": {"any_hit": compliant},
                        "phone_heuristic": {"min_distance": if compliant { 0.03 } else { 0.3 }, "threshold": 0.05, "is_phone_talking": false}
                    }]
                })
            })
            .collect();
        CString::new(serde_json::to_string(&frames).unwrap()).unwrap()
    }

    #[test]
    fn test_ffi_simulate_json() {
        let frames = sample_frames_json();

        unsafe {
            let result = resim_simulate_json(frames.as_ptr(), 0.05, 0.1, 24);
            assert!(!result.is_null());

            let result_str = CStr::from_ptr(result).to_str().unwrap();
            let run: serde_json::Value = serde_json::from_str(result_str).unwrap();
            assert_eq!(run["stats"]["total_frames"], 6);
            assert_eq!(run["stats"]["phone_frames"], 3);
            assert_eq!(run["events"][0]["event_type"], "compliant_start");

            resim_free_string(result);
        }
    }

    #[test]
    fn test_ffi_compare_json() {
        let frames = sample_frames_json();
        let tuned = CString::new(r#"{"phone_threshold": 0.01}"#).unwrap();

        unsafe {
            let result = resim_compare_json(frames.as_ptr(), ptr::null(), tuned.as_ptr());
            assert!(!result.is_null());

            let result_str = CStr::from_ptr(result).to_str().unwrap();
            let comparison: serde_json::Value = serde_json::from_str(result_str).unwrap();
            assert_eq!(comparison["delta"]["phone_frames_change"], -3);

            resim_free_string(result);
        }
    }

    #[test]
    fn test_ffi_simulator_lifecycle() {
        let frames = sample_frames_json();

        unsafe {
            let simulator = resim_simulator_new(frames.as_ptr());
            assert!(!simulator.is_null());

            let result = resim_simulator_run(simulator, 0.05, 0.1, 24);
            assert!(!result.is_null());
            resim_free_string(result);

            // Memoized second run
            let result = resim_simulator_run(simulator, 0.05, 0.1, 24);
            assert!(!result.is_null());
            resim_free_string(result);
            assert_eq!((*simulator).simulator.cached_runs(), 1);

            let result = resim_simulator_compare(simulator, ptr::null(), ptr::null());
            assert!(!result.is_null());
            resim_free_string(result);

            resim_simulator_free(simulator);
        }
    }

    #[test]
    fn test_ffi_error_handling() {
        let frames = sample_frames_json();

        unsafe {
            let result = resim_simulate_json(frames.as_ptr(), 0.05, -1.0, 24);
            assert!(result.is_null());

            let error = resim_last_error();
            assert!(!error.is_null());
            let error_str = CStr::from_ptr(error).to_str().unwrap();
            assert!(error_str.contains("debounce"));

            let invalid_json = CString::new("not json").unwrap();
            let simulator = resim_simulator_new(invalid_json.as_ptr());
            assert!(simulator.is_null());
            assert!(!resim_last_error().is_null());
        }
    }

    #[test]
    fn test_ffi_version() {
        unsafe {
            let version = resim_version();
            assert!(!version.is_null());

            let version_str = CStr::from_ptr(version).to_str().unwrap();
            assert!(!version_str.is_empty());
        }
    }
}
