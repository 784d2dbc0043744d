use static_sv::error::AppError;
use static_sv::fs::DirEntryInfo;
use static_sv::templates::TemplateEngine;
use std::collections::HashMap;

/// Templates are compiled in and render without filesystem access.
#[test]
fn test_embedded_templates_functionality() {
    let engine = TemplateEngine::new();

    let mut variables = HashMap::new();
    variables.insert("TITLE", "/test/path".to_string());
    variables.insert("STYLES", "body{}".to_string());
    variables.insert("BREADCRUMBS", "<a href=\"/\">root</a>".to_string());
    variables.insert("ENTRY_COUNT", "5".to_string());
    variables.insert("ENTRIES", "<tr><td>test file</td></tr>".to_string());

    let html = engine.render("directory/index.html", &variables).unwrap();
    assert!(html.contains("Index of /test/path"));
    assert!(html.contains("test file"));
    assert!(html.contains("5 entries"));
    assert!(!html.contains("{{"), "every placeholder should be filled");
}

#[test]
fn test_embedded_stylesheet_is_available() {
    let engine = TemplateEngine::new();
    let css = engine.get("directory/styles.css").unwrap();
    assert!(css.contains(".breadcrumbs"));
    assert!(css.contains("tr.unavailable"));
}

#[test]
fn test_missing_template_is_an_error() {
    let engine = TemplateEngine::new();
    let err = engine.render("nope.html", &HashMap::new()).unwrap_err();
    assert!(matches!(err, AppError::Template(_)));
    assert_eq!(err.status_code(), 500);
}

#[test]
fn test_listing_is_self_contained() {
    let entries = vec![DirEntryInfo::File {
        name: "report.pdf".to_string(),
        size: 1_048_576,
        created: None,
    }];
    let html = TemplateEngine::new()
        .render_directory_listing("", "", &entries)
        .unwrap();

    assert!(html.contains("<style>"));
    assert!(html.contains(".breadcrumbs"));
    assert!(!html.contains("<link"));
    assert!(!html.contains("<script"));
    assert!(html.contains("1.00 M"));
    assert!(html.contains(r#"<a href="/report.pdf">report.pdf</a>"#));
    assert!(html.contains(r#"<td class="date">-</td>"#));
}
