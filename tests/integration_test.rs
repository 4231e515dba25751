use std::collections::HashMap;
use std::net::IpAddr;

use request_binder::coerce::{parse_bool, parse_int};
use request_binder::web::{query_source, RequestAdapter};
use request_binder::{
    BindField, Bindable, Binder, BoxError, DecodeParams, Failure, FieldDescriptor, HttpMethod,
    Kind, Parsed, Shape, Slot, UploadedFile,
};
use serde::{Deserialize, Serialize};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[test]
fn map_destinations_receive_path_and_query_values() {
    init_tracing();
    let mut request = RequestAdapter::new(HttpMethod::Get);
    request.add_path_param("org", "acme");
    request.set_query("tag=a&tag=b");

    let mut firsts: HashMap<String, String> = HashMap::new();
    Binder::new().bind(&mut firsts, &request).unwrap();
    assert_eq!(firsts["org"], "acme");
    assert_eq!(firsts["tag"], "a");

    let mut all: HashMap<String, Vec<String>> = HashMap::new();
    Binder::new().bind(&mut all, &request).unwrap();
    assert_eq!(all["tag"], vec!["a", "b"]);

    let mut values: HashMap<String, serde_json::Value> = HashMap::new();
    Binder::new().bind(&mut values, &request).unwrap();
    assert_eq!(values["tag"], serde_json::json!("a"));
}

#[test]
fn json_body_fills_a_map_destination() {
    let mut request = RequestAdapter::new(HttpMethod::Post);
    request.add_path_param("org", "acme");
    request.set_body("application/json", br#"{"name": "x"}"#.to_vec());

    let mut map: HashMap<String, String> = HashMap::new();
    Binder::new().bind(&mut map, &request).unwrap();

    assert_eq!(map["org"], "acme");
    assert_eq!(map["name"], "x");
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Range {
    low: i32,
    high: i32,
}

impl DecodeParams for Range {
    fn decode_params(&mut self, values: &[String]) -> Result<(), BoxError> {
        let mut parsed = values
            .iter()
            .map(|value| value.parse::<i32>())
            .collect::<Result<Vec<_>, _>>()?;
        parsed.sort_unstable();
        let (Some(&low), Some(&high)) = (parsed.first(), parsed.last()) else {
            return Err("empty range".into());
        };
        *self = Range { low, high };
        Ok(())
    }
}

impl BindField for Range {
    fn slot(&mut self) -> Slot<'_> {
        Slot::DecodeAll(self)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct Report {
    range: Range,
    window: Option<Range>,
}

impl Bindable for Report {
    fn fields() -> &'static [FieldDescriptor<Self>] {
        const FIELDS: &[FieldDescriptor<Report>] = &[
            FieldDescriptor::new("range", |r: &mut Report| &mut r.range).query("r"),
            FieldDescriptor::new("window", |r: &mut Report| &mut r.window).query("w"),
        ];
        FIELDS
    }
}

#[test]
fn multi_value_decoder_sees_every_value() {
    let mut request = RequestAdapter::new(HttpMethod::Get);
    request.set_query("r=9&r=-2&r=4&w=1&w=3");

    let mut report = Report::default();
    Binder::new().bind(&mut report, &request).unwrap();

    assert_eq!(report.range, Range { low: -2, high: 9 });
    assert_eq!(report.window, Some(Range { low: 1, high: 3 }));
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Peer {
    addr: Parsed<IpAddr>,
    port: Parsed<u16>,
}

impl Bindable for Peer {
    fn fields() -> &'static [FieldDescriptor<Self>] {
        const FIELDS: &[FieldDescriptor<Peer>] = &[
            FieldDescriptor::new("addr", |p: &mut Peer| &mut p.addr).query("addr"),
            FieldDescriptor::new("port", |p: &mut Peer| &mut p.port).query("port"),
        ];
        FIELDS
    }
}

#[test]
fn from_str_types_bind_through_parsed() {
    let mut request = RequestAdapter::new(HttpMethod::Get);
    request.set_query("addr=10.1.2.3&port=8443");

    let mut peer = Peer {
        addr: Parsed(IpAddr::from([0, 0, 0, 0])),
        port: Parsed(0),
    };
    Binder::new().bind(&mut peer, &request).unwrap();

    assert_eq!(peer.addr.0, IpAddr::from([10, 1, 2, 3]));
    assert_eq!(peer.port, Parsed(8443));

    let mut bad = RequestAdapter::new(HttpMethod::Get);
    bad.set_query("addr=localhost");
    let err = Binder::new().bind(&mut peer, &bad).unwrap_err();
    match err.failure() {
        Some(Failure::Conversion { field, .. }) => assert_eq!(field, "addr"),
        other => panic!("unexpected failure: {other:?}"),
    }
    assert_eq!(peer.addr.0, IpAddr::from([10, 1, 2, 3]));
}

#[test]
fn shapes_are_visible_to_callers() {
    assert_eq!(Range::default().slot().shape(), Shape::Bare(Kind::DecodeAll));
    assert_eq!(
        Vec::<Option<UploadedFile>>::new().slot().shape(),
        Shape::SequenceOfOptional(Kind::File)
    );
}

#[test]
fn coercion_helpers_are_public() {
    assert_eq!(parse_int::<u16>("", "u16").unwrap(), 0);
    assert!(parse_bool("True").unwrap());
    assert!(parse_bool("yes").is_err());
}

#[test]
fn query_source_is_usable_standalone() {
    let source = query_source("a=1&A=2");

    assert_eq!(source.get("a").unwrap(), ["1"]);
    assert_eq!(source.lookup("A").unwrap(), ["2"]);
}

#[test]
fn methods_parse_from_tokens() {
    let method: HttpMethod = "DELETE".parse().unwrap();
    assert!(method.binds_query_params());
    assert!("BREW".parse::<HttpMethod>().is_err());
}
