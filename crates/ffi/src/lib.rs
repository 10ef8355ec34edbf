//! C ABI for calling chew from other languages.
//!
//! `Process` takes a comma separated list of urls (or `file://` paths)
//! and returns a newly allocated string with the extracted text. The
//! string must be released with `FreeString`.

use std::ffi::{c_char, CStr, CString};
use std::fmt::Write;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use chew_client::{Chew, Chunk, Config};
use tracing::error;

const TIMEOUT: Duration = Duration::from_secs(5);

fn config() -> Config {
    Config {
        user_agent: "Chew/1.0 (+https://github.com/mmatongo/chew)".to_owned(),
        retry_limit: 3,
        retry_delay: Duration::from_secs(1),
        crawl_delay: Duration::from_secs(1),
        rate_limit: Duration::from_secs(1),
        rate_burst: 1,
        ignore_robots_txt: false,
        ..Config::default()
    }
}

fn split_inputs(urls: &str) -> Vec<&str> {
    urls.split(',')
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .collect()
}

/// Never fails, errors are reported in the returned text.
fn run(urls: &str, config: Config, timeout: Duration) -> String {
    let inputs = split_inputs(urls);
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => return format!("Error processing URLs: {e}"),
    };

    let res = runtime.block_on(process(&inputs, config, timeout));

    match res {
        Ok(Some(chunks)) => chunks.iter().fold(String::new(), |mut out, chunk| {
            let _ = write!(out, "Source: {}\nContent: {}\n\n", chunk.source, chunk.content);
            out
        }),
        Ok(None) => "Operation timed out".to_owned(),
        Err(e) => format!("Error processing URLs: {e}"),
    }
}

/// `None` when the timeout ran out
async fn process(
    inputs: &[&str],
    config: Config,
    timeout: Duration,
) -> Result<Option<Vec<Chunk>>, chew_client::Error> {
    let chew = Chew::new(config)?;
    match tokio::time::timeout(timeout, chew.process(inputs)).await {
        Ok(res) => res.map(Some),
        Err(_elapsed) => Ok(None),
    }
}

fn into_raw(text: String) -> *mut c_char {
    // interior nul bytes can not be represented in a C string
    let text = text.replace('\0', "");
    CString::new(text).map_or(std::ptr::null_mut(), CString::into_raw)
}

/// # Safety
/// `urls` must be null or point to a nul terminated string that stays
/// valid for the duration of the call.
#[no_mangle]
#[allow(non_snake_case)]
pub unsafe extern "C" fn Process(urls: *const c_char) -> *mut c_char {
    if urls.is_null() {
        return std::ptr::null_mut();
    }
    let urls = CStr::from_ptr(urls).to_string_lossy().into_owned();

    let text = panic::catch_unwind(AssertUnwindSafe(|| run(&urls, config(), TIMEOUT)))
        .unwrap_or_else(|_| {
            error!("panicked while processing {urls}");
            "Error processing URLs: internal panic".to_owned()
        });
    into_raw(text)
}

/// # Safety
/// `ptr` must be null or a string returned by [`Process`] that has not
/// been freed yet.
#[no_mangle]
#[allow(non_snake_case)]
pub unsafe extern "C" fn FreeString(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}
