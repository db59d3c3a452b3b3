use chrono::NaiveDate;
use lagcast::data::{Frequency, TimeIndex};
use lagcast::utils::{date_to_index_position, parse_date, DateInput, PositionOptions};
use lagcast::ForecastError;

fn daily(periods: usize) -> TimeIndex {
    TimeIndex::date_range(parse_date("1990-01-01", None).unwrap(), periods, Frequency::days(1)).unwrap()
}

#[test]
fn test_type_error_when_index_is_not_datetime() {
    let index = TimeIndex::range(0, 3);
    let err = date_to_index_position(&index, &"1990-01-10".into(), &PositionOptions::default())
        .unwrap_err();
    assert!(matches!(err, ForecastError::TypeError(_)));
    assert_eq!(
        err.to_string(),
        "Index must be a pandas DatetimeIndex when `steps` is not an integer. \
         Check input series or last window."
    );
}

#[test]
fn test_value_error_when_date_is_before_last_index() {
    let err = date_to_index_position(&daily(3), &"1990-01-02".into(), &PositionOptions::default())
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "The provided date must be later than the last date in the index."
    );
}

#[test]
fn test_output_with_different_input_types() {
    let index = daily(3);
    let timestamp = NaiveDate::from_ymd_opt(1990, 1, 7)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let inputs = [
        DateInput::from("1990-01-07"),
        DateInput::from(timestamp),
        DateInput::from(4i64),
    ];
    for input in &inputs {
        let position = date_to_index_position(&index, input, &PositionOptions::default()).unwrap();
        assert_eq!(position, 4, "input {:?}", input);
    }
}

#[test]
fn test_output_with_custom_date_format() {
    let options = PositionOptions::default().with_date_format("%Y-%d-%m");
    let position = date_to_index_position(&daily(3), &"1990-07-01".into(), &options).unwrap();
    assert_eq!(position, 4);
}

#[test]
fn test_value_error_when_date_out_of_range_in_validation() {
    let err = date_to_index_position(
        &daily(3),
        &"1990-01-10".into(),
        &PositionOptions::validation("initial_train_size"),
    )
    .unwrap_err();
    assert_eq!(
        err.to_string(),
        "The provided date must be later than the first date in the index \
         and earlier than the last date."
    );
}

#[test]
fn test_output_when_date_in_range_in_validation() {
    let options = PositionOptions::validation("initial_train_size");
    let index = daily(5);
    assert_eq!(date_to_index_position(&index, &"1990-01-03".into(), &options).unwrap(), 2);
    assert_eq!(date_to_index_position(&index, &"1990-01-01".into(), &options).unwrap(), 0);
}

#[test]
fn test_value_error_when_integer_out_of_range_in_validation() {
    let options = PositionOptions::validation("initial_train_size");
    for value in [-1i64, 10] {
        let err = date_to_index_position(&daily(3), &DateInput::Position(value), &options).unwrap_err();
        assert_eq!(err.to_string(), "The provided integer must be between 0 and 2.");
    }
}

#[test]
fn test_date_literal_in_messages() {
    let options = PositionOptions::default().with_date_literal("initial_train_size");
    let err = date_to_index_position(&TimeIndex::range(0, 5), &"2020-01-01".into(), &options)
        .unwrap_err();
    assert!(err.to_string().contains("`initial_train_size` is not an integer"));
}
