use super::*;

const STATUS_REQ: &[u8] =
    b"GET /status?ts=1724612345 HTTP/1.1\r\nHost: 192.168.4.1\r\nAccept: */*\r\n\r\n";

#[test]
fn head_end_points_past_terminator() {
    assert_eq!(head_end(b"GET / HTTP/1.1\r\n\r\nrest"), Some(18));
    assert_eq!(head_end(b"GET / HTTP/1.1\r\nHost: x"), None);
}

#[test]
fn parses_request_line_and_strips_query() {
    let head = parse_request_head(STATUS_REQ).unwrap();
    assert_eq!(head.method, Method::Get);
    assert_eq!(head.path, "/status");
}

#[test]
fn parses_post_target() {
    let head = parse_request_head(b"POST /set HTTP/1.1\r\n\r\n").unwrap();
    assert_eq!(head.method, Method::Post);
    assert_eq!(head.path, "/set");
}

#[test]
fn unknown_method_still_parses() {
    let head = parse_request_head(b"BREW /pot HTTP/1.1\r\n\r\n").unwrap();
    assert_eq!(head.method, Method::Other);
    assert_eq!(Route::resolve(head.method, head.path), Route::NotFound);
}

#[test]
fn one_token_request_line_is_rejected() {
    assert_eq!(
        parse_request_head(b"GARBAGE\r\n\r\n"),
        Err(RequestError::BadRequestLine)
    );
}

#[test]
fn request_line_needs_exactly_three_tokens() {
    assert_eq!(
        parse_request_head(b"GET /\r\n\r\n"),
        Err(RequestError::BadRequestLine)
    );
    assert_eq!(
        parse_request_head(b"GET / HTTP/1.1 junk\r\n\r\n"),
        Err(RequestError::BadRequestLine)
    );
}

#[test]
fn empty_input_is_rejected() {
    assert_eq!(parse_request_head(b""), Err(RequestError::BadRequestLine));
}

#[test]
fn non_utf8_head_is_rejected() {
    assert_eq!(
        parse_request_head(b"GET /\xff\xfe HTTP/1.1\r\n\r\n"),
        Err(RequestError::BadEncoding)
    );
}

#[test]
fn header_lookup_ignores_case_and_whitespace() {
    let head = parse_request_head(
        b"POST /set HTTP/1.1\r\nCONTENT-length:  7 \r\nContent-Type: application/x-www-form-urlencoded\r\n\r\n",
    )
    .unwrap();
    assert_eq!(head.header_value("Content-Length"), Some("7"));
    assert_eq!(head.header_value("content-type"), Some("application/x-www-form-urlencoded"));
    assert_eq!(head.header_value("Host"), None);
}

#[test]
fn content_length_defaults_and_caps() {
    let with = parse_request_head(b"POST /set HTTP/1.1\r\nContent-Length: 6\r\n\r\n").unwrap();
    assert_eq!(with.content_length(2048), 6);
    assert_eq!(with.content_length(4), 4);

    let missing = parse_request_head(b"POST /set HTTP/1.1\r\n\r\n").unwrap();
    assert_eq!(missing.content_length(2048), 0);

    let garbage = parse_request_head(b"POST /set HTTP/1.1\r\nContent-Length: lots\r\n\r\n").unwrap();
    assert_eq!(garbage.content_length(2048), 0);
}

#[test]
fn form_field_scans_pairs() {
    assert_eq!(form_field(b"sec=42", "sec"), Some("42"));
    assert_eq!(form_field(b"a=1&sec=90&b=2", "sec"), Some("90"));
    assert_eq!(form_field(b"a=1&b=2", "sec"), None);
    assert_eq!(form_field(b"", "sec"), None);
}

#[test]
fn form_field_last_duplicate_wins() {
    assert_eq!(form_field(b"sec=5&sec=10", "sec"), Some("10"));
}

#[test]
fn form_field_takes_values_literally() {
    // No percent-decoding: the page posts plain digits.
    assert_eq!(form_field(b"sec=%31%30", "sec"), Some("%31%30"));
    assert_eq!(form_field(b"lone&sec=3", "sec"), Some("3"));
    assert_eq!(form_field(b"sec=", "sec"), Some(""));
}

#[test]
fn route_table_is_exact() {
    assert_eq!(Route::resolve(Method::Get, "/"), Route::Index);
    assert_eq!(Route::resolve(Method::Get, "/status"), Route::Status);
    assert_eq!(Route::resolve(Method::Post, "/set"), Route::Set);
    assert_eq!(Route::resolve(Method::Post, "/stop"), Route::Stop);
    assert_eq!(Route::resolve(Method::Post, "/ledoff"), Route::LedOff);

    assert_eq!(Route::resolve(Method::Get, "/set"), Route::NotFound);
    assert_eq!(Route::resolve(Method::Post, "/"), Route::NotFound);
    assert_eq!(Route::resolve(Method::Get, "/index.html"), Route::NotFound);
}

#[test]
fn only_set_reads_a_body() {
    assert!(Route::Set.needs_body());
    assert!(!Route::Stop.needs_body());
    assert!(!Route::LedOff.needs_body());
    assert!(!Route::Status.needs_body());
    assert!(!Route::Index.needs_body());
}

#[test]
fn response_head_is_framed_exactly() {
    let mut head: heapless::String<256> = heapless::String::new();
    write_response_head(&mut head, StatusCode::Ok, "text/plain", 3).unwrap();
    assert_eq!(
        head.as_str(),
        "HTTP/1.1 200 OK\r\n\
         Content-Type: text/plain\r\n\
         Content-Length: 3\r\n\
         Cache-Control: no-store, no-cache, must-revalidate, max-age=0\r\n\
         Pragma: no-cache\r\n\
         Connection: close\r\n\
         \r\n"
    );
}

#[test]
fn status_lines_cover_the_fault_ladder() {
    assert_eq!(StatusCode::BadRequest.code(), 400);
    assert_eq!(StatusCode::NotFound.code(), 404);
    assert_eq!(StatusCode::Error.code(), 500);
    assert_eq!(StatusCode::Error.reason(), "Internal Server Error");

    let mut head: heapless::String<256> = heapless::String::new();
    write_response_head(&mut head, StatusCode::NotFound, "text/plain", 10).unwrap();
    assert!(head.starts_with("HTTP/1.1 404 Not Found\r\n"));
    assert!(head.contains("Connection: close\r\n"));
}
