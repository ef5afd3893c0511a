use hashbag::HashBag;
use pretty_assertions::assert_eq;
use serde_json::{json, Value as Json};

use crate::{error::CompileError, Error, Ledger, Result, SqliteStorage};

const DAY: f64 = 86_400.0;

fn setup_ledger() -> Ledger<SqliteStorage> {
    let mut ledger = Ledger::new(SqliteStorage::open_in_memory().unwrap());
    ledger.add_account("ann", "s3cret").unwrap();
    ledger.add_product("tea", 250).unwrap();
    ledger.add_product("cake", 400).unwrap();
    ledger
}

fn send(ledger: &mut Ledger<SqliteStorage>, requests: Json) -> Result<Vec<Json>> {
    ledger.handle(&json!({
        "authent": { "username": "ann", "password": "s3cret" },
        "requests": requests,
    }))
}

/// Three sales: two of tea on the first day, one of cake in between.
fn seeded_ledger() -> Ledger<SqliteStorage> {
    let mut ledger = setup_ledger();
    let responses = send(
        &mut ledger,
        json!([{
            "type": "add",
            "records": [
                { "product": 1, "quantity": 2, "dateTime": "19700101T090000Z" },
                { "product": 2, "quantity": 1, "dateTime": "19700101T100000Z" },
                { "product": 1, "quantity": 5, "dateTime": "19700102T090000Z" },
            ]
        }]),
    )
    .unwrap();
    assert_eq!(responses, [Json::Null]);
    ledger
}

fn sales_of(rows: &Json) -> Vec<(i64, i64, String)> {
    rows.as_array()
        .unwrap()
        .iter()
        .map(|row| {
            (
                row["product"].as_i64().unwrap(),
                row["quantity"].as_i64().unwrap(),
                row["dateTime"].as_str().unwrap().to_owned(),
            )
        })
        .collect()
}

fn test_retrieve(filter: Json, expected: &[(i64, i64, &str)]) {
    let mut ledger = seeded_ledger();
    let responses = send(&mut ledger, json!([{ "type": "retrieve", "filter": filter }])).unwrap();
    assert_eq!(responses.len(), 1);

    let sales = sales_of(&responses[0]);
    let result = HashBag::from_iter(sales.iter().map(|(p, q, dt)| (*p, *q, dt.as_str())));
    let expected = HashBag::from_iter(expected.iter().copied());
    assert_eq!(result, expected);
}

fn column_value(name: &str, value: Json) -> Json {
    json!({ "type": "column", "name": name, "value": value })
}

#[test]
fn test_retrieve_all() {
    let mut ledger = seeded_ledger();
    let responses = send(&mut ledger, json!([{ "type": "retrieve" }])).unwrap();
    assert_eq!(
        responses[0][0],
        json!({
            "id": 1,
            "product": 1,
            "quantity": 2,
            "dateTime": "19700101T090000Z",
            "name": "tea",
            "unitValueCents": 250,
        })
    );
    assert_eq!(
        sales_of(&responses[0]),
        [
            (1, 2, "19700101T090000Z".to_owned()),
            (2, 1, "19700101T100000Z".to_owned()),
            (1, 5, "19700102T090000Z".to_owned()),
        ]
    );
}

#[test]
fn test_column_value() {
    test_retrieve(
        column_value("name", json!("tea")),
        &[(1, 2, "19700101T090000Z"), (1, 5, "19700102T090000Z")],
    );
    test_retrieve(
        column_value("unitValueCents", json!(400)),
        &[(2, 1, "19700101T100000Z")],
    );
}

#[test]
fn test_column_range() {
    test_retrieve(
        json!({
            "type": "column",
            "name": "quantity",
            "inRange": { "low": 1, "lowInclusive": true, "high": 5, "highInclusive": false }
        }),
        &[(1, 2, "19700101T090000Z"), (2, 1, "19700101T100000Z")],
    );
    test_retrieve(
        json!({
            "type": "column",
            "name": "dateTime",
            "inRange": {
                "low": "19700101T100000Z", "lowInclusive": true,
                "high": "19700102T090000Z", "highInclusive": true
            }
        }),
        &[(2, 1, "19700101T100000Z"), (1, 5, "19700102T090000Z")],
    );
}

#[test]
fn test_logic() {
    test_retrieve(
        json!({ "type": "logicNot", "child": column_value("name", json!("tea")) }),
        &[(2, 1, "19700101T100000Z")],
    );
    test_retrieve(
        json!({
            "type": "logicXor",
            "children": [column_value("name", json!("tea")), column_value("quantity", json!(1))]
        }),
        &[(1, 2, "19700101T090000Z"), (1, 5, "19700102T090000Z")],
    );
    test_retrieve(
        json!({
            "type": "logicGe",
            "pivot": 2,
            "children": [
                column_value("name", json!("tea")),
                column_value("quantity", json!(5)),
                column_value("product", json!(2)),
            ]
        }),
        &[(1, 5, "19700102T090000Z")],
    );
    test_retrieve(json!({ "type": "logicOr", "children": [] }), &[]);
}

#[test]
fn test_edit_updates_matched_sales() {
    let mut ledger = seeded_ledger();
    let responses = send(
        &mut ledger,
        json!([
            {
                "type": "edit",
                "updateTo": { "quantity": 7, "dateTime": "19700103T000000Z" },
                "filter": column_value("name", json!("tea"))
            },
            { "type": "retrieve" }
        ]),
    )
    .unwrap();
    assert_eq!(responses[0], json!(2));
    assert_eq!(
        sales_of(&responses[1]),
        [
            (1, 7, "19700103T000000Z".to_owned()),
            (2, 1, "19700101T100000Z".to_owned()),
            (1, 7, "19700103T000000Z".to_owned()),
        ]
    );
}

#[test]
fn test_edit_without_matches() {
    let mut ledger = seeded_ledger();
    let responses = send(
        &mut ledger,
        json!([{
            "type": "edit",
            "updateTo": { "product": 2 },
            "filter": column_value("quantity", json!(100))
        }]),
    )
    .unwrap();
    assert_eq!(responses, [json!(0)]);
}

#[test]
fn test_edit_many_matches() {
    let mut ledger = setup_ledger();
    let records: Vec<Json> = (0..1500)
        .map(|i| {
            json!({
                "product": 1,
                "quantity": 1,
                "dateTime": format!("19700101T{:02}{:02}00Z", i / 60 % 24, i % 60),
            })
        })
        .collect();
    let responses = send(
        &mut ledger,
        json!([
            { "type": "add", "records": records },
            {
                "type": "edit",
                "updateTo": { "quantity": 2 },
                "filter": column_value("product", json!(1))
            },
            { "type": "retrieve" }
        ]),
    )
    .unwrap();
    assert_eq!(responses[..2], [Json::Null, json!(1500)]);

    let sales = sales_of(&responses[2]);
    assert_eq!(sales.len(), 1500);
    assert!(sales.iter().all(|(_, quantity, _)| *quantity == 2));
}

fn trendline(ledger: &mut Ledger<SqliteStorage>, request: Json) -> (f64, f64, f64) {
    let responses = send(ledger, json!([request])).unwrap();
    let fit = &responses[0];
    (
        fit["m"].as_f64().unwrap(),
        fit["c"].as_f64().unwrap(),
        fit["r2"].as_f64().unwrap(),
    )
}

fn assert_close(actual: (f64, f64, f64), expected: (f64, f64, f64)) {
    let close = |a: f64, b: f64| (a - b).abs() <= 1e-9 * b.abs();
    assert!(
        close(actual.0, expected.0) && close(actual.1, expected.1) && close(actual.2, expected.2),
        "{:?} != {:?}",
        actual,
        expected
    );
}

#[test]
fn test_trendline_daily_units() {
    let mut ledger = seeded_ledger();
    let request = json!({
        "type": "trendline", "fit": "linear", "y": "unitsSold",
        "cumulative": false, "granularity": 86400
    });
    // Day buckets hold 3 and 5 units.
    assert_close(trendline(&mut ledger, request), (2.0 / DAY, 3.0, 1.0));
}

#[test]
fn test_trendline_cumulative_revenue() {
    let mut ledger = seeded_ledger();
    let request = json!({
        "type": "trendline", "fit": "linear", "y": "revenue",
        "cumulative": true, "granularity": 86400
    });
    // Day one: 2*250 + 1*400 = 900; day two adds 5*250.
    assert_close(trendline(&mut ledger, request), (1250.0 / DAY, 900.0, 1.0));
}

#[test]
fn test_trendline_filtered_without_buckets() {
    let mut ledger = seeded_ledger();
    let request = json!({
        "type": "trendline", "fit": "linear", "y": "unitsSold", "cumulative": false,
        "filter": column_value("name", json!("tea"))
    });
    assert_close(trendline(&mut ledger, request), (3.0 / DAY, 2.0 - 3.0 * 9.0 / 24.0, 1.0));
}

#[test]
fn test_trendline_needs_two_points() {
    let mut ledger = seeded_ledger();
    let responses = send(
        &mut ledger,
        json!([{
            "type": "trendline", "fit": "linear", "y": "unitsSold", "cumulative": false,
            "filter": column_value("product", json!(2))
        }]),
    )
    .unwrap();
    assert_eq!(
        responses,
        [json!(
            "trendline failed: linear regression requires at least two unique x values \
             and is undefined for a vertical line"
        )]
    );
}

#[test]
fn test_bad_credentials() {
    let mut ledger = setup_ledger();
    let body = json!({
        "authent": { "username": "ann", "password": "' OR '1'='1" },
        "requests": [{ "type": "add", "records": [
            { "product": 1, "quantity": 1, "dateTime": "19700101T000000Z" }
        ]}]
    });
    assert!(matches!(ledger.handle(&body), Err(Error::Authentication)));
    assert!(matches!(
        ledger.handle(&json!({ "requests": [] })),
        Err(Error::Authentication)
    ));

    let responses = send(&mut ledger, json!([{ "type": "retrieve" }])).unwrap();
    assert_eq!(responses, [json!([])]);
}

#[test]
fn test_batch_stops_at_first_failure() {
    let mut ledger = setup_ledger();
    let responses = send(
        &mut ledger,
        json!([
            { "type": "add", "records": [
                { "product": 1, "quantity": 1, "dateTime": "19700101T000000Z" }
            ]},
            { "type": "add", "records": [
                { "product": 99, "quantity": 1, "dateTime": "19700101T000000Z" }
            ]},
            { "type": "retrieve" }
        ]),
    )
    .unwrap();
    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0], Json::Null);
    assert!(responses[1].as_str().unwrap().starts_with("storage failure"));

    let responses = send(&mut ledger, json!([{ "type": "retrieve" }])).unwrap();
    assert_eq!(sales_of(&responses[0]), [(1, 1, "19700101T000000Z".to_owned())]);
}

#[test]
fn test_parse_failure_runs_nothing() {
    let mut ledger = setup_ledger();
    let err = send(
        &mut ledger,
        json!([
            { "type": "add", "records": [
                { "product": 1, "quantity": 1, "dateTime": "19700101T000000Z" }
            ]},
            { "type": "retrieve", "filter": { "type": "logicMaybe" } }
        ]),
    )
    .unwrap_err();
    assert!(matches!(err, Error::Compile(CompileError::UndefinedFilterType { .. })));
    assert_eq!(
        err.to_string(),
        "filter compilation failed: undefined filter type \"logicMaybe\" at [requests -> 1 -> filter]"
    );

    let responses = send(&mut ledger, json!([{ "type": "retrieve" }])).unwrap();
    assert_eq!(responses, [json!([])]);
}

#[test]
fn test_quotes_survive_round_trip() {
    let mut ledger = setup_ledger();
    ledger.add_product("O'Brien's scone", 325).unwrap();
    let responses = send(
        &mut ledger,
        json!([
            { "type": "add", "records": [
                { "product": 3, "quantity": 4, "dateTime": "19700101T000000Z" }
            ]},
            { "type": "retrieve", "filter": column_value("name", json!("O'Brien's scone")) }
        ]),
    )
    .unwrap();
    assert_eq!(responses[1][0]["name"], json!("O'Brien's scone"));
    assert_eq!(responses[1][0]["unitValueCents"], json!(325));
}

#[test]
fn test_malformed_json_text() {
    let mut ledger = setup_ledger();
    assert!(matches!(ledger.handle_str("{\"requests\": ["), Err(Error::Json(_))));
}
