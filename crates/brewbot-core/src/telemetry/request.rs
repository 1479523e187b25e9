use core::fmt::Write;

use heapless::String;

use super::TelemetryError;

/// Largest request the transports will send in one write
pub const MAX_REQUEST_LEN: usize = 512;

/// Build an HTTP/1.0 JSON POST. The connection is closed after the response.
pub fn format_post(
    host: &str,
    path: &str,
    body: &str,
) -> Result<String<MAX_REQUEST_LEN>, TelemetryError> {
    let mut request = String::new();
    write!(
        request,
        "POST {path} HTTP/1.0\r\n\
         Host: {host}\r\n\
         Content-Type: application/json\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n\
         {body}",
        body.len()
    )
    .map_err(|_| TelemetryError::RequestTooLarge)?;
    Ok(request)
}

/// Status code from the first line of a response, e.g. `HTTP/1.1 204 No Content`.
pub fn parse_status_code(response: &[u8]) -> Result<u16, TelemetryError> {
    let line_end = response
        .iter()
        .position(|&b| b == b'\r' || b == b'\n')
        .unwrap_or(response.len());
    let line =
        core::str::from_utf8(&response[..line_end]).map_err(|_| TelemetryError::MalformedResponse)?;

    let mut parts = line.split_ascii_whitespace();
    match (parts.next(), parts.next()) {
        (Some(version), Some(code)) if version.starts_with("HTTP/") && code.len() == 3 => code
            .parse()
            .map_err(|_| TelemetryError::MalformedResponse),
        _ => Err(TelemetryError::MalformedResponse),
    }
}
