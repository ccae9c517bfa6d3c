//! End-to-end rendering tests over the produced PDF bytes.
//!
//! pdf-writer emits uncompressed content streams, so literal text drawn
//! on a page can be asserted by searching the document bytes.

use chrono::{NaiveDate, Utc};
use serde_json::json;
use uuid::Uuid;

use pdf_template_renderer::{
    Author, Context, ContextBuilder, Layout, MedicalRecord, Organization, Patient, RenderError,
    TemplateRenderer, Visit,
};

fn bytes_contain(haystack: &[u8], needle: &str) -> bool {
    let needle = needle.as_bytes();
    haystack.windows(needle.len()).any(|w| w == needle)
}

fn count_occurrences(haystack: &[u8], needle: &str) -> usize {
    let needle = needle.as_bytes();
    haystack.windows(needle.len()).filter(|w| *w == needle).count()
}

fn ctx(value: serde_json::Value) -> Context {
    Context::from_value(value)
}

fn layout(value: serde_json::Value) -> Layout {
    Layout::from_json(&value.to_string()).unwrap()
}

#[test]
fn placeholder_round_trip() {
    let layout = layout(json!({
        "sections": [{
            "title": "Details",
            "grid": {"columns": 1, "items": [
                {"type": "text", "content": "{{patient.full_name}}"}
            ]}
        }],
        "footer": {"text": "Done"}
    }));
    let context = ctx(json!({"patient": {"full_name": "Jane Doe"}}));
    let pdf = TemplateRenderer::default()
        .render(&layout, &context, "en")
        .unwrap();

    assert!(pdf.starts_with(b"%PDF-"));
    assert!(bytes_contain(&pdf, "Jane Doe"));
    assert!(!bytes_contain(&pdf, "{{patient.full_name}}"));
}

#[test]
fn scenario_with_text_and_qr_beside_each_other() {
    let layout = layout(json!({
        "sections": [{
            "title": "Summary",
            "grid": {"columns": 2, "items": [
                {"type": "text", "content": "{{date}}"},
                {"type": "qrcode", "value": "{{uuid}}"}
            ]}
        }],
        "footer": {"text": "Done"}
    }));
    let context = ctx(json!({"date": "2024-01-15", "uuid": "abc-123"}));
    let pdf = TemplateRenderer::default()
        .render(&layout, &context, "en")
        .unwrap();

    assert!(bytes_contain(&pdf, "Summary"));
    assert!(bytes_contain(&pdf, "2024-01-15"));
    assert!(bytes_contain(&pdf, "Done"));
}

#[test]
fn localized_footer_uses_active_locale_then_first_entry() {
    let layout = layout(json!({
        "sections": [],
        "footer": {"text": {"en": "Thanks", "fr": "Merci"}}
    }));
    let renderer = TemplateRenderer::default();
    let context = Context::default();

    let pdf = renderer.render(&layout, &context, "fr").unwrap();
    assert!(bytes_contain(&pdf, "Merci"));
    assert!(!bytes_contain(&pdf, "Thanks"));

    let pdf = renderer.render(&layout, &context, "de").unwrap();
    assert!(bytes_contain(&pdf, "Thanks"));
}

#[test]
fn conditional_block_is_gated_on_resolved_condition() {
    let make = |flag: &str| {
        let layout = layout(json!({
            "sections": [{
                "title": "S",
                "grid": {"columns": 1, "items": [{
                    "type": "conditional",
                    "condition": "{{flag}}",
                    "block": {"type": "text", "content": "HIDDEN-MARKER"}
                }]}
            }],
            "footer": {"text": "F"}
        }));
        TemplateRenderer::default()
            .render(&layout, &ctx(json!({"flag": flag})), "en")
            .unwrap()
    };

    assert!(!bytes_contain(&make(""), "HIDDEN-MARKER"));
    assert!(bytes_contain(&make("1"), "HIDDEN-MARKER"));
}

#[test]
fn unknown_block_type_fails_the_render() {
    let layout = layout(json!({
        "sections": [{
            "title": "S",
            "grid": {"columns": 1, "items": [{"type": "bogus"}]}
        }],
        "footer": {"text": "F"}
    }));
    let err = TemplateRenderer::default()
        .render(&layout, &Context::default(), "en")
        .unwrap_err();
    assert!(matches!(err, RenderError::UnknownBlockType { .. }));
}

#[test]
fn missing_required_field_fails_the_render() {
    let layout = layout(json!({
        "sections": [{
            "title": "S",
            "grid": {"columns": 1, "items": [{"type": "text"}]}
        }],
        "footer": {"text": "F"}
    }));
    let err = TemplateRenderer::default()
        .render(&layout, &Context::default(), "en")
        .unwrap_err();
    assert!(matches!(
        err,
        RenderError::MissingField {
            block: "text",
            field: "content"
        }
    ));
}

#[test]
fn deep_nesting_is_rejected() {
    let mut block = json!({"type": "text", "content": "leaf"});
    for _ in 0..32 {
        block = json!({"type": "conditional", "condition": "1", "block": block});
    }
    let layout = layout(json!({
        "sections": [{"title": "S", "grid": {"columns": 1, "items": [block]}}],
        "footer": {"text": "F"}
    }));
    let err = TemplateRenderer::default()
        .render(&layout, &Context::default(), "en")
        .unwrap_err();
    assert!(matches!(err, RenderError::DepthExceeded(_)));
}

#[test]
fn tables_resolve_every_cell() {
    let layout = layout(json!({
        "sections": [{
            "title": "Medications",
            "grid": {"columns": 1, "items": [{
                "type": "table",
                "columns": 3,
                "widths": [60, 60, 60],
                "rows": [
                    ["{{drug.name}}", "{{drug.dose}}", "{{drug.route}}"],
                    ["Paracetamol", "500 mg", "oral"]
                ]
            }]}
        }],
        "footer": {"text": "F"}
    }));
    let context = ctx(json!({"drug": {"name": "Ibuprofen", "dose": "200 mg", "route": "oral"}}));
    let pdf = TemplateRenderer::default()
        .render(&layout, &context, "en")
        .unwrap();

    for text in ["Ibuprofen", "200 mg", "Paracetamol", "500 mg"] {
        assert!(bytes_contain(&pdf, text), "missing cell text {text}");
    }
}

#[test]
fn json_table_draws_context_data() {
    let layout = layout(json!({
        "sections": [{
            "title": "Data",
            "grid": {"columns": 1, "items": [{"type": "json_table"}]}
        }],
        "footer": {"text": "F"}
    }));
    let context = ctx(json!({
        "data_json": {"blood_pressure": "120/80", "allergies": ["nuts", "dust"]}
    }));
    let pdf = TemplateRenderer::default()
        .render(&layout, &context, "en")
        .unwrap();

    assert!(bytes_contain(&pdf, "blood_pressure"));
    assert!(bytes_contain(&pdf, "120/80"));
    // Array values are stringified as JSON.
    assert!(bytes_contain(&pdf, r#"["nuts","dust"#));
}

#[test]
fn nested_section_and_grid_blocks_render() {
    let layout = layout(json!({
        "sections": [{
            "title": "Outer",
            "grid": {"columns": 1, "items": [{
                "type": "section",
                "title": "Inner heading",
                "items": [
                    {"type": "grid", "columns": 2, "items": [
                        {"type": "text", "content": "cell-a"},
                        {"type": "text", "content": "cell-b"},
                        {"type": "text", "content": "cell-c"}
                    ]},
                    {"type": "signature"}
                ]
            }]}
        }],
        "footer": {"text": "F"}
    }));
    let pdf = TemplateRenderer::default()
        .render(&layout, &Context::default(), "en")
        .unwrap();

    for text in ["Inner heading", "cell-a", "cell-b", "cell-c", "Signature: ______"] {
        assert!(bytes_contain(&pdf, text), "missing {text}");
    }
}

#[test]
fn chart_block_dumps_data_as_json() {
    let layout = layout(json!({
        "sections": [{
            "title": "Vitals",
            "grid": {"columns": 1, "items": [{
                "type": "chart",
                "data": {"series": [1, 2, 3]}
            }]}
        }],
        "footer": {"text": "F"}
    }));
    let pdf = TemplateRenderer::default()
        .render(&layout, &Context::default(), "en")
        .unwrap();
    assert!(bytes_contain(&pdf, r#"{"series":[1,2,3]}"#));
}

#[test]
fn long_documents_paginate() {
    let items: Vec<_> = (0..120)
        .map(|i| json!({"type": "text", "content": format!("line number {i}")}))
        .collect();
    let layout = layout(json!({
        "sections": [{"title": "Long", "grid": {"columns": 1, "items": items}}],
        "footer": {"text": "F"}
    }));
    let pdf = TemplateRenderer::default()
        .render(&layout, &Context::default(), "en")
        .unwrap();

    // One MediaBox entry per page.
    assert!(count_occurrences(&pdf, "/MediaBox") >= 2);
    assert!(bytes_contain(&pdf, "line number 119"));
}

#[test]
fn fallback_layout_renders_a_full_record() {
    let record = MedicalRecord {
        id: 42,
        uuid: Uuid::new_v4(),
        record_type: "discharge_summary".to_string(),
        title: "Discharge".to_string(),
        summary: Some("Recovered without complications".to_string()),
        data: {
            let mut m = serde_json::Map::new();
            m.insert("temperature".to_string(), json!("36.8"));
            m
        },
        created_at: Utc::now(),
        organization: Some(Organization {
            name: "Sunrise Clinic".to_string(),
            code: "SUN".to_string(),
            address: None,
            phone: None,
            email: None,
        }),
        patient: Some(Patient {
            id: 3,
            uuid: Uuid::new_v4(),
            mrn: "MRN-003".to_string(),
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            sex: Some("F".to_string()),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 4, 2),
            national_id: None,
            email: None,
            phone: None,
            address: None,
            emergency_contact: None,
            notes: None,
            is_active: true,
        }),
        visit: Some(Visit {
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            visit_type: "inpatient".to_string(),
            diagnosis: Some("J06.9".to_string()),
            notes: None,
            status: "closed".to_string(),
        }),
        authored_by: Some(Author {
            name: "Dr. Smith".to_string(),
            role: "physician".to_string(),
            email: None,
        }),
    };

    let layout = Layout::fallback().unwrap();
    let context = ContextBuilder::from_record(&record);
    let pdf = TemplateRenderer::default()
        .render(&layout, &context, "en")
        .unwrap();

    for text in [
        "Jane Doe",
        "MRN-003",
        "2024-01-15",
        "temperature",
        "Recovered without complications",
        "Sunrise Clinic",
        "Dr. Smith",
    ] {
        assert!(bytes_contain(&pdf, text), "missing {text}");
    }
}

#[test]
fn renders_are_independent_across_calls() {
    let layout = layout(json!({
        "sections": [{"title": "S", "grid": {"columns": 1, "items": [
            {"type": "text", "content": "{{marker}}"}
        ]}}],
        "footer": {"text": "F"}
    }));
    let renderer = TemplateRenderer::default();

    let first = renderer
        .render(&layout, &ctx(json!({"marker": "first-run"})), "en")
        .unwrap();
    let second = renderer
        .render(&layout, &ctx(json!({"marker": "second-run"})), "en")
        .unwrap();

    assert!(bytes_contain(&first, "first-run"));
    assert!(!bytes_contain(&first, "second-run"));
    assert!(bytes_contain(&second, "second-run"));
    assert!(!bytes_contain(&second, "first-run"));
}
