use super::*;

#[test]
fn normalize_email_accepts_basic_address() {
    assert_eq!(normalize_email("  Traveller@Example.com "), Some("traveller@example.com".to_owned()));
}

#[test]
fn normalize_email_rejects_malformed() {
    for bad in ["", "user", "@example.com", "user@", "a@b@c.com", "user@example", "user@.com", "us er@example.com"] {
        assert_eq!(normalize_email(bad), None, "accepted {bad:?}");
    }
}

#[test]
fn digits_check_is_exact_length() {
    assert!(is_digits("123456789012", 12));
    assert!(is_digits(" 9876543210 ", 10));
    assert!(!is_digits("12345678901", 12));
    assert!(!is_digits("1234567890123", 12));
    assert!(!is_digits("12345678901a", 12));
    assert!(!is_digits("", 12));
}

#[test]
fn date_and_time_parsing() {
    let date = parse_date("2026-10-16").unwrap();
    assert_eq!(date.year(), 2026);
    assert_eq!(u8::from(date.month()), 10);
    assert_eq!(date.day(), 16);
    assert!(parse_date("16/10/2026").is_none());
    assert!(parse_date("2026-02-30").is_none());

    let t = parse_time("09:45").unwrap();
    assert_eq!((t.hour(), t.minute()), (9, 45));
    assert!(parse_time("25:00").is_none());
    assert!(parse_time("9am").is_none());
}
