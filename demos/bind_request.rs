//! Request binding demonstration.
//!
//! This example walks one record through the binding phases:
//! 1. Path parameters
//! 2. Query parameters (GET only)
//! 3. JSON, form and multipart bodies
//! 4. Headers, bound on request
//! 5. Failures and their status codes
//!
//! Run with: `cargo run --example bind_request`

use request_binder::web::RequestAdapter;
use request_binder::{
    Bindable, Binder, FieldDescriptor, HttpMethod, MultipartForm, UploadedFile,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct CreateTicket {
    project: String,
    title: String,
    priority: u8,
    labels: Vec<String>,
    trace_id: Option<String>,
    #[serde(skip)]
    screenshots: Vec<UploadedFile>,
}

impl Bindable for CreateTicket {
    fn fields() -> &'static [FieldDescriptor<Self>] {
        const FIELDS: &[FieldDescriptor<CreateTicket>] = &[
            FieldDescriptor::new("project", |t: &mut CreateTicket| &mut t.project)
                .param("project"),
            FieldDescriptor::new("title", |t: &mut CreateTicket| &mut t.title)
                .query("title")
                .form("title"),
            FieldDescriptor::new("priority", |t: &mut CreateTicket| &mut t.priority)
                .query("priority")
                .form("priority"),
            FieldDescriptor::new("labels", |t: &mut CreateTicket| &mut t.labels)
                .query("label")
                .form("label"),
            FieldDescriptor::new("trace_id", |t: &mut CreateTicket| &mut t.trace_id)
                .header("X-Trace-Id"),
            FieldDescriptor::new("screenshots", |t: &mut CreateTicket| &mut t.screenshots)
                .form("screenshot"),
        ];
        FIELDS
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let binder = Binder::new();

    println!("=== Request Binding Demo ===\n");

    println!("1. GET with path and query parameters");
    let mut request = RequestAdapter::new(HttpMethod::Get).with_request_id("req-0001");
    request.add_path_param("project", "core");
    request.set_query("title=Crash+on+start&priority=2&label=bug&label=p1");
    let mut ticket = CreateTicket::default();
    binder.bind(&mut ticket, &request)?;
    println!("   {:?}\n", ticket);

    println!("2. POST with a JSON body (query string ignored)");
    let mut request = RequestAdapter::new(HttpMethod::Post).with_request_id("req-0002");
    request.add_path_param("project", "core");
    request.set_query("priority=9");
    request.set_body(
        "application/json",
        br#"{"title": "Slow search", "labels": ["perf"]}"#.to_vec(),
    );
    let mut ticket = CreateTicket::default();
    binder.bind(&mut ticket, &request)?;
    println!("   {:?}\n", ticket);

    println!("3. POST with a multipart form");
    let mut form = MultipartForm::new();
    form.add_value("title", "Broken layout");
    form.add_value("priority", "1");
    form.add_file(
        "screenshot",
        UploadedFile::new("layout.png", Some("image/png".to_string()), vec![0x89, 0x50]),
    );
    let mut request = RequestAdapter::new(HttpMethod::Post).with_request_id("req-0003");
    request.add_path_param("project", "web");
    request.add_header("X-Trace-Id", "trace-42");
    request.set_multipart_form(form);
    let mut ticket = CreateTicket::default();
    binder.bind(&mut ticket, &request)?;
    binder.bind_headers(&mut ticket, &request)?;
    println!("   {:?}\n", ticket);

    println!("4. Failures");
    let mut request = RequestAdapter::new(HttpMethod::Get).with_request_id("req-0004");
    request.set_query("priority=urgent");
    if let Err(err) = binder.bind(&mut CreateTicket::default(), &request) {
        println!("   {} -> {}", err.status(), err);
    }

    let mut request = RequestAdapter::new(HttpMethod::Post).with_request_id("req-0005");
    request.set_body("text/csv", b"title,priority".to_vec());
    if let Err(err) = binder.bind(&mut CreateTicket::default(), &request) {
        println!("   {} -> {}", err.status(), err);
    }

    println!("\n=== Demo Complete ===");
    Ok(())
}
