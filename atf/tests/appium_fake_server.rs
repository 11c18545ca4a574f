use atf::platforms::appium::{AppiumNavigationProvider, AppiumSession};
use atf::{AutomationError, Condition, Element, ElementCreator, Key, Session, Settings};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

const SESSION: &str = "/wd/hub/session/s1";

#[derive(Debug, Clone)]
struct Recorded {
    method: String,
    path: String,
    body: Value,
}

struct FakeDriver {
    url: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
    _server: Arc<tiny_http::Server>,
}

impl FakeDriver {
    fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    fn values_sent_to(&self, element: &str) -> Vec<String> {
        let path = format!("{SESSION}/element/{element}/value");
        self.requests()
            .into_iter()
            .filter(|r| r.method == "POST" && r.path == path)
            .map(|r| r.body["text"].as_str().unwrap().to_string())
            .collect()
    }
}

fn element(id: &str) -> Value {
    json!({ "status": 0, "value": { "ELEMENT": id } })
}

fn ok() -> Value {
    json!({ "status": 0, "value": null })
}

/// A desktop with a Run dialog and a calculator window.
fn desktop_routes(method: &str, path: &str, body: &Value) -> (u16, Value) {
    if method == "POST" && path == "/wd/hub/session" {
        return (200, json!({ "sessionId": "s1", "status": 0, "value": {} }));
    }
    let Some(command) = path.strip_prefix(SESSION) else {
        return (404, json!({ "value": { "error": "unknown command", "message": path } }));
    };
    let using = body["using"].as_str().unwrap_or_default();
    let value = body["value"].as_str().unwrap_or_default();
    match (method, command, using, value) {
        ("POST", "/element", "class name", "#32769") => (200, element("desktop")),
        ("POST", "/element/desktop/element", "name", "Run") => (200, element("run")),
        ("POST", "/element/desktop/element", "name", "Calculator") => (200, element("calc")),
        ("POST", "/element/run/element", "accessibility id", "12298") => (200, element("combo")),
        ("POST", "/element/combo/element", "accessibility id", "1001") => (200, element("edit")),
        ("POST", "/element/calc/element", "accessibility id", "num1Button") => {
            (200, element("one"))
        }
        ("POST", "/element/calc/elements", "class name", "Button") => (
            200,
            json!({ "value": [
                { "element-6066-11e4-a52e-4f735466cecf": "one" },
                { "element-6066-11e4-a52e-4f735466cecf": "two" },
            ] }),
        ),
        ("POST", c, _, _) if c.ends_with("/elements") => (
            404,
            json!({ "value": {
                "error": "no such element",
                "message": "An element could not be located on the page using the given search parameters."
            } }),
        ),
        ("POST", c, _, _) if c.ends_with("/element") => (
            404,
            json!({ "status": 7, "value": { "message": "An element could not be located" } }),
        ),
        ("GET", "/element/one/attribute/Name", _, _) => (200, json!({ "status": 0, "value": "One" })),
        ("GET", "/element/two/attribute/Name", _, _) => (200, json!({ "status": 0, "value": "Two" })),
        ("GET", c, _, _) if c.ends_with("/attribute/IsEnabled") => {
            (200, json!({ "status": 0, "value": "True" }))
        }
        ("GET", c, _, _) if c.ends_with("/attribute/HelpText") => {
            (200, json!({ "status": 0, "value": null }))
        }
        ("POST", "/moveto" | "/click" | "/doubleclick", _, _) => (200, ok()),
        ("POST", c, _, _) if c.ends_with("/value") => (200, ok()),
        ("DELETE", "", _, _) => (200, ok()),
        _ => (
            500,
            json!({ "value": { "error": "unknown command", "message": format!("{method} {command}") } }),
        ),
    }
}

fn start_fake_driver() -> FakeDriver {
    let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
    let port = server.server_addr().to_ip().unwrap().port();
    let server_arc = Arc::new(server);
    let server_clone = server_arc.clone();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let recorder = requests.clone();

    thread::spawn(move || {
        for mut request in server_clone.incoming_requests() {
            let mut raw = String::new();
            request.as_reader().read_to_string(&mut raw).unwrap();
            let body: Value = serde_json::from_str(&raw).unwrap_or(Value::Null);
            let method = request.method().as_str().to_string();
            let path = request.url().to_string();
            let (status, reply) = desktop_routes(&method, &path, &body);
            recorder.lock().unwrap().push(Recorded { method, path, body });

            let header: tiny_http::Header = "Content-Type: application/json".parse().unwrap();
            let response = tiny_http::Response::from_string(reply.to_string())
                .with_status_code(status)
                .with_header(header);
            request.respond(response).unwrap();
        }
    });

    FakeDriver {
        url: format!("http://127.0.0.1:{port}"),
        requests,
        _server: server_arc,
    }
}

fn fast_settings(url: &str) -> Settings {
    Settings {
        action_delay_ms: 0,
        retry_delay_ms: 0,
        retry_count: 2,
        wait_poll_interval_ms: 10,
        wait_default_timeout_ms: 200,
        machine_url: url.to_string(),
        ..Settings::default()
    }
}

fn connect(driver: &FakeDriver) -> Session {
    let settings = fast_settings(&driver.url);
    let provider = AppiumNavigationProvider::connect(&settings).unwrap();
    Session::from_provider(provider, ElementCreator::standard())
}

#[test]
fn new_session_sends_desktop_capabilities() {
    let driver = start_fake_driver();
    let session = AppiumSession::start(&fast_settings(&driver.url)).unwrap();
    assert_eq!(session.session_id(), "s1");

    let start = &driver.requests()[0];
    assert_eq!(start.path, "/wd/hub/session");
    let desired = &start.body["desiredCapabilities"];
    assert_eq!(desired["app"], "Root");
    assert_eq!(desired["deviceName"], "WindowsPC");
    assert_eq!(desired["platformName"], "Windows");
    assert_eq!(start.body["capabilities"]["alwaysMatch"], *desired);
}

#[test]
fn finds_and_clicks_a_button_in_a_window() {
    let driver = start_fake_driver();
    let session = connect(&driver);
    let calc = session.navigation().window_root("Calculator").unwrap();

    let one: Element = calc
        .find_element(&[Condition::automation_id("num1Button")])
        .unwrap();
    assert_eq!(one.name().unwrap(), "One");
    assert_eq!(session.navigation().current_window_title().as_deref(), Some("Calculator"));

    one.click().unwrap();
    let input: Vec<(String, Value)> = driver
        .requests()
        .into_iter()
        .filter(|r| r.path.ends_with("/moveto") || r.path.ends_with("/click"))
        .map(|r| (r.path.trim_start_matches(SESSION).to_string(), r.body))
        .collect();
    assert_eq!(
        input,
        vec![
            ("/moveto".to_string(), json!({ "element": "one" })),
            ("/click".to_string(), json!({ "button": 0 })),
        ]
    );
}

#[test]
fn find_all_reads_w3c_element_references() {
    let driver = start_fake_driver();
    let session = connect(&driver);
    let calc = session.navigation().window_root("Calculator").unwrap();

    let buttons = calc.find_all(&[Condition::class_name("Button")]).unwrap();
    let names: Vec<String> = buttons.iter().map(|b| b.name().unwrap()).collect();
    assert_eq!(names, ["One", "Two"]);
}

#[test]
fn missing_elements_exhaust_the_retries() {
    let driver = start_fake_driver();
    let session = connect(&driver);
    let calc = session.navigation().window_root("Calculator").unwrap();
    let before = driver.requests().len();

    match calc.find_first(&[Condition::automation_id("equalButton")]) {
        Err(AutomationError::Navigation { attempts, .. }) => assert_eq!(attempts, 2),
        other => panic!("expected a navigation error, got {other:?}"),
    }
    let lookups = driver.requests()[before..]
        .iter()
        .filter(|r| r.path == format!("{SESSION}/element/calc/element"))
        .count();
    assert_eq!(lookups, 2);

    let none = calc.find_all(&[Condition::class_name("Edit")]).unwrap();
    assert!(none.is_empty());
}

#[test]
fn unknown_condition_keys_are_not_retried() {
    let driver = start_fake_driver();
    let session = connect(&driver);
    let calc = session.navigation().window_root("Calculator").unwrap();
    let before = driver.requests().len();

    let err = calc.find_first(&[Condition::new("Parent", "calc")]).unwrap_err();
    assert!(err.is_search_criteria());
    assert_eq!(driver.requests().len(), before);
}

#[test]
fn key_combination_is_sent_as_nested_code_points() {
    let driver = start_fake_driver();
    let session = connect(&driver);
    let calc = session.navigation().window_root("Calculator").unwrap();
    let one = calc
        .find_first(&[Condition::automation_id("num1Button")])
        .unwrap();

    one.press_key_combo(&[Key::Control, Key::Shift, Key::Escape])
        .unwrap();
    one.item().press_modified_key(Key::Control, 'a').unwrap();
    assert_eq!(
        driver.values_sent_to("one"),
        [
            "\u{E009}\u{E008}\u{E00C}\u{E008}\u{E009}".to_string(),
            "\u{E009}a\u{E009}".to_string(),
        ]
    );
}

#[test]
fn launches_an_application_through_the_run_dialog() {
    let driver = start_fake_driver();
    let session = connect(&driver);

    assert!(session.navigation().launch_application(
        "calc.exe",
        "Calculator",
        Duration::ZERO
    ));
    assert_eq!(driver.values_sent_to("desktop"), ["\u{E03D}r\u{E03D}"]);
    assert_eq!(driver.values_sent_to("edit"), ["calc.exe", "\u{E007}"]);
    assert_eq!(
        driver.values_sent_to("calc"),
        ["\u{E03D}\u{E013}\u{E03D}", "\u{E03D}\u{E013}\u{E03D}"]
    );
    assert_eq!(session.navigation().visited_windows(), ["Calculator"]);
    assert_eq!(session.navigation().current_window_title().as_deref(), Some("Calculator"));
}

#[test]
fn launch_reports_false_when_the_window_never_appears() {
    let driver = start_fake_driver();
    let session = connect(&driver);

    assert!(!session.navigation().launch_application(
        "notepad.exe",
        "Notepad",
        Duration::ZERO
    ));
    assert_eq!(driver.values_sent_to("edit"), ["notepad.exe", "\u{E007}"]);
    assert_eq!(session.navigation().current_window_title().as_deref(), Some("Run"));
}

#[test]
fn session_end_deletes_the_remote_session() {
    let driver = start_fake_driver();
    let session = AppiumSession::start(&fast_settings(&driver.url)).unwrap();
    assert!(session.is_alive());
    session.end().unwrap();
    let last = driver.requests().pop().unwrap();
    assert_eq!((last.method.as_str(), last.path.as_str()), ("DELETE", SESSION));
}
