mod common;

use std::time::Duration;

use common::{page, FakeSurface};
use form_autofill::executor::{ExecutionState, FORM_INDICATOR};
use form_autofill::instructions::build_selector;
use form_autofill::{AutofillOptions, Autofiller, FieldKind, FillInstruction, FillMethod};

const URL: &str = "https://jobs.example.com/apply";

fn options() -> AutofillOptions {
    AutofillOptions {
        typing_delay_ms: None,
        ..AutofillOptions::default()
    }
}

fn instruction(name: &str, kind: FieldKind) -> FillInstruction {
    FillInstruction {
        field_name: name.to_string(),
        kind,
        selector: build_selector(name, "", kind, None),
        fill_method: FillMethod::for_kind(kind),
        value: None,
        selected_value: None,
        checked: None,
        file_paths: Vec::new(),
    }
}

fn text(name: &str, value: &str) -> FillInstruction {
    FillInstruction {
        value: Some(value.to_string()),
        ..instruction(name, FieldKind::Text)
    }
}

fn checkbox(name: &str, checked: bool) -> FillInstruction {
    FillInstruction {
        checked: Some(checked),
        ..instruction(name, FieldKind::Checkbox)
    }
}

#[tokio::test]
async fn missing_element_is_recorded_and_run_continues() {
    let surface = FakeSurface::single(
        URL,
        r#"<form><input type="text" name="first_name"></form>"#,
    );
    let instructions = vec![text("nickname", "Johnny"), text("first_name", "John")];

    let options = options();
    let result = Autofiller::new(&surface, &options).run(URL, &instructions).await;

    assert!(result.success);
    assert_eq!(result.not_filled_fields, vec!["nickname".to_string()]);
    assert_eq!(result.filled_fields, vec![instructions[1].selector.clone()]);
    assert_eq!(surface.value_of("input[name='first_name']").as_deref(), Some("John"));
    assert_eq!(result.metrics.fill_rate, 50.0);
}

#[tokio::test]
async fn second_page_is_filled_after_next_click() {
    let page_two = "https://jobs.example.com/apply/2";
    let first = page(&format!(
        r#"<form>
             <input type="text" name="first_name">
             <button type="button" data-goto="{page_two}">Next</button>
           </form>"#
    ));
    let second = page(
        r#"<form>
             <input type="text" name="first_name">
             <button type="submit">Submit application</button>
           </form>"#,
    );
    let surface = FakeSurface::new(&[(URL, first.as_str()), (page_two, second.as_str())]);
    let options = AutofillOptions {
        handle_pagination: true,
        ..options()
    };
    let instructions = vec![text("first_name", "John")];

    let result = Autofiller::new(&surface, &options).run(URL, &instructions).await;

    assert!(result.success);
    assert_eq!(result.filled_fields.len(), 2);
    assert!(result.not_filled_fields.is_empty());
    assert_eq!(result.final_url, page_two);
    assert_ne!(result.final_url, URL);
    assert_eq!(surface.value_of("input[name='first_name']").as_deref(), Some("John"));
    assert!(surface
        .actions()
        .contains(&"click_text:button:Next".to_string()));
}

#[tokio::test]
async fn pagination_disabled_fills_one_page() {
    let surface = FakeSurface::single(
        URL,
        r#"<form><input name="email"><button data-goto="https://elsewhere.test">Next</button></form>"#,
    );
    let options = options();
    let result = Autofiller::new(&surface, &options)
        .run(URL, &[text("email", "john@example.com")])
        .await;

    assert_eq!(result.filled_fields.len(), 1);
    assert_eq!(result.final_url, URL);
    assert!(!surface.actions().iter().any(|a| a.starts_with("click_text")));
}

#[tokio::test]
async fn failed_navigation_attempts_no_fields() {
    let surface = FakeSurface::single(URL, "<form><input name='email'></form>");
    let options = options();
    let result = Autofiller::new(&surface, &options)
        .run("https://unreachable.test/apply", &[text("email", "john@example.com")])
        .await;

    assert!(!result.success);
    assert!(result.error.as_deref().unwrap().contains("unreachable.test"));
    assert!(result.filled_fields.is_empty());
    assert!(result.not_filled_fields.is_empty());
    assert_eq!(result.metrics.fill_rate, 0.0);
}

#[tokio::test(start_paused = true)]
async fn slow_navigation_fails_the_run_without_touching_fields() {
    let surface = FakeSurface::single(URL, "<form><input type='text' name='email'></form>")
        .with_goto_delay(Duration::from_secs(5));
    let options = AutofillOptions {
        navigation_timeout_ms: 1_000,
        ..options()
    };
    let result = Autofiller::new(&surface, &options)
        .run(URL, &[text("email", "john@example.com")])
        .await;

    assert!(!result.success);
    assert!(result.error.as_deref().unwrap().contains("exceeded 1000ms"));
    assert!(result.filled_fields.is_empty());
    assert!(result.not_filled_fields.is_empty());
    assert!(surface
        .actions()
        .iter()
        .all(|a| !a.starts_with("type:") && !a.starts_with("click")));
}

#[tokio::test(start_paused = true)]
async fn navigation_within_timeout_still_fills() {
    let surface = FakeSurface::single(URL, "<form><input type='text' name='email'></form>")
        .with_goto_delay(Duration::from_millis(500));
    let options = AutofillOptions {
        navigation_timeout_ms: 1_000,
        ..options()
    };
    let result = Autofiller::new(&surface, &options)
        .run(URL, &[text("email", "john@example.com")])
        .await;

    assert!(result.success);
    assert_eq!(result.filled_fields.len(), 1);
}

#[tokio::test]
async fn missing_form_indicator_is_a_soft_timeout() {
    let surface = FakeSurface::single(URL, "<textarea name='summary'></textarea>");
    let instructions = vec![FillInstruction {
        value: Some("Ten years of Rust".to_string()),
        ..instruction("summary", FieldKind::Textarea)
    }];
    let options = AutofillOptions {
        load_timeout_ms: 10,
        ..options()
    };
    let result = Autofiller::new(&surface, &options).run(URL, &instructions).await;

    assert!(surface.actions().contains(&format!("not_ready:{FORM_INDICATOR}")));
    assert!(result.success);
    assert!(result.error.is_none());
    assert_eq!(result.filled_fields, vec![instructions[0].selector.clone()]);
    assert_eq!(surface.value_of("textarea[name='summary']").as_deref(), Some("Ten years of Rust"));
}

#[tokio::test]
async fn fill_replaces_existing_text_with_paced_typing() {
    let surface = FakeSurface::single(URL, r#"<input type="text" name="city" value="Old Town">"#);
    let options = AutofillOptions {
        typing_delay_ms: Some((0, 0)),
        ..options()
    };
    let result = Autofiller::new(&surface, &options)
        .run(URL, &[text("city", "Anytown")])
        .await;

    assert_eq!(result.filled_fields.len(), 1);
    assert_eq!(surface.value_of("input[name='city']").as_deref(), Some("Anytown"));
    let typed = surface.actions().iter().filter(|a| a.starts_with("type:")).count();
    assert_eq!(typed, "Anytown".len());
}

#[tokio::test]
async fn empty_value_is_a_valid_fill() {
    let surface = FakeSurface::single(URL, r#"<input name="middle_name" value="Q">"#);
    let options = options();
    let result = Autofiller::new(&surface, &options)
        .run(URL, &[text("middle_name", "")])
        .await;

    assert_eq!(result.filled_fields.len(), 1);
    assert_eq!(surface.value_of("input[name='middle_name']").as_deref(), Some(""));
}

#[tokio::test]
async fn checkbox_is_clicked_only_when_state_differs() {
    let surface = FakeSurface::single(
        URL,
        r#"<form>
             <input type="checkbox" name="terms" checked>
             <input type="checkbox" name="newsletter">
           </form>"#,
    );
    let options = options();
    let result = Autofiller::new(&surface, &options)
        .run(URL, &[checkbox("terms", true), checkbox("newsletter", true)])
        .await;

    assert_eq!(result.filled_fields.len(), 2);
    assert_eq!(surface.clicks(), 1);
    assert_eq!(surface.checked_of("input[name='newsletter']"), Some(true));
    assert_eq!(surface.checked_of("input[name='terms']"), Some(true));
}

#[tokio::test]
async fn checkbox_can_be_unchecked() {
    let surface = FakeSurface::single(URL, r#"<input type="checkbox" name="relocate" checked>"#);
    let options = options();
    Autofiller::new(&surface, &options)
        .run(URL, &[checkbox("relocate", false)])
        .await;

    assert_eq!(surface.checked_of("input[name='relocate']"), Some(false));
}

#[tokio::test]
async fn radio_is_clicked_unconditionally() {
    let surface = FakeSurface::single(
        URL,
        r#"<input type="radio" name="remote" value="yes" checked>
           <input type="radio" name="remote" value="no">"#,
    );
    let mut remote = instruction("remote", FieldKind::Radio);
    remote.selector = build_selector("remote", "", FieldKind::Radio, Some("yes"));
    remote.checked = Some(true);

    let options = options();
    let result = Autofiller::new(&surface, &options).run(URL, &[remote]).await;

    assert_eq!(result.filled_fields.len(), 1);
    assert_eq!(surface.clicks(), 1);
}

#[tokio::test]
async fn select_uses_resolved_option_value() {
    let surface = FakeSurface::single(
        URL,
        r#"<select name="degree">
             <option value="">Choose</option>
             <option value="ba">Bachelor's</option>
             <option value="ma">Master's</option>
           </select>"#,
    );
    let mut degree = instruction("degree", FieldKind::Select);
    degree.selected_value = Some("ma".into());
    let mut missing_option = instruction("degree", FieldKind::Select);
    missing_option.selected_value = Some("phd".into());

    let options = options();
    let result = Autofiller::new(&surface, &options)
        .run(URL, &[degree, missing_option])
        .await;

    assert_eq!(result.filled_fields.len(), 1);
    assert_eq!(result.not_filled_fields, vec!["degree".to_string()]);
    assert_eq!(surface.value_of("select[name='degree']").as_deref(), Some("ma"));
}

#[tokio::test]
async fn file_input_without_paths_is_not_filled() {
    let surface = FakeSurface::single(
        URL,
        r#"<input type="file" name="resume"><input type="file" name="cover_letter">"#,
    );
    let mut resume = instruction("resume", FieldKind::File);
    resume.file_paths = vec!["/tmp/resume.pdf".into()];
    let cover_letter = instruction("cover_letter", FieldKind::File);

    let options = options();
    let result = Autofiller::new(&surface, &options)
        .run(URL, &[resume, cover_letter])
        .await;

    assert_eq!(result.not_filled_fields, vec!["cover_letter".to_string()]);
    assert_eq!(
        surface.files_of("input[name='resume']"),
        Some(vec!["/tmp/resume.pdf".to_string()])
    );
}

#[tokio::test]
async fn unsupported_method_is_not_filled() {
    let surface = FakeSurface::single(URL, r#"<input name="signature">"#);
    let mut signature = text("signature", "John Doe");
    signature.fill_method = FillMethod::Unsupported;

    let options = options();
    let result = Autofiller::new(&surface, &options).run(URL, &[signature]).await;

    assert!(result.success);
    assert_eq!(result.not_filled_fields, vec!["signature".to_string()]);
    assert!(surface.actions().iter().all(|a| !a.starts_with("type:")));
}

#[tokio::test]
async fn fill_rate_stays_in_bounds() {
    let surface = FakeSurface::single(URL, r#"<input name="a1"><input name="b2">"#);
    let options = options();
    let cases: Vec<Vec<FillInstruction>> = vec![
        vec![],
        vec![text("a1", "x")],
        vec![text("zz", "x")],
        vec![text("a1", "x"), text("b2", "y"), text("zz", "z")],
    ];
    for instructions in cases {
        let result = Autofiller::new(&surface, &options).run(URL, &instructions).await;
        let rate = result.metrics.fill_rate;
        assert!((0.0..=100.0).contains(&rate), "rate {rate} out of bounds");
        if instructions.is_empty() {
            assert_eq!(rate, 0.0);
        }
    }
}

#[test]
fn autofiller_starts_idle() {
    let surface = FakeSurface::single(URL, "<form></form>");
    let options = options();
    let filler = Autofiller::new(&surface, &options);
    assert_eq!(filler.state(), ExecutionState::Idle);
    assert!(FORM_INDICATOR.contains("form"));
}
