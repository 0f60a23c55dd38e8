use std::fs;

use locheal_core::attributes::HealTargets;
use locheal_core::captures::{list_captures, load_captures, read_page_source};
use locheal_core::chunker::{divide_into_chunks, sliding_chunks, truncate_at_tag_boundary, TRUNCATION_MARKER};
use locheal_core::page::{analyze_page, detect_automation_type, find_similar_elements};
use locheal_core::types::{AutomationType, ContextStats, HealResult, LocatorAttributes};

const ANDROID_DUMP: &str = r#"<hierarchy rotation="0"><node index="0" class="android.widget.FrameLayout" package="com.app" bounds="[0,0][1080,2160]"><node index="1" text="Search" resource-id="com.app:id/search_image" class="android.widget.ImageView" content-desc="Search medicines"/></node></hierarchy>"#;

#[test]
fn detects_automation_type_by_priority() {
    assert_eq!(detect_automation_type(ANDROID_DUMP), AutomationType::MobileAndroid);
    assert_eq!(detect_automation_type("<XCUIElementTypeButton name='ok'/>"), AutomationType::MobileIos);
    assert_eq!(detect_automation_type("<!DOCTYPE html><HTML><body></body></HTML>"), AutomationType::Web);
    assert_eq!(detect_automation_type("<root><leaf/></root>"), AutomationType::Unknown);
    // resource-id wins even inside an html document
    assert_eq!(detect_automation_type("<html><div resource-id='x'/></html>"), AutomationType::MobileAndroid);
}

#[test]
fn automation_type_parses_and_serializes() {
    assert_eq!("mobile_android".parse::<AutomationType>().expect("parse"), AutomationType::MobileAndroid);
    assert_eq!("WEB".parse::<AutomationType>().expect("parse"), AutomationType::Web);
    assert!("desktop".parse::<AutomationType>().is_err());
    assert_eq!(serde_json::to_string(&AutomationType::MobileIos).expect("json"), "\"MOBILE_IOS\"");
}

#[test]
fn analyze_page_collects_bounded_inventories() {
    let html = r#"<html><body><form id="login"><input id="user" class="field wide" name="user"/><button id="go" class="btn primary">Sign in</button></form><div class="card">Welcome back</div><a href="/x">ok</a></body></html>"#;
    let analysis = analyze_page(html);
    assert_eq!(analysis.automation_type, AutomationType::Web);
    assert_eq!(analysis.form_elements.len(), 3, "form, input and button tags");
    assert_eq!(analysis.interactive_elements.len(), 3, "input, button and anchor");
    assert_eq!(analysis.container_elements.len(), 1);
    assert_eq!(analysis.elements_with_ids.get("user").map(String::as_str), Some("input"));
    assert_eq!(analysis.elements_with_ids.get("go").map(String::as_str), Some("button"));
    assert!(analysis.elements_with_classes["button"].contains("primary"));
    assert!(analysis.elements_with_classes["input"].contains("wide"));
    assert!(analysis.text_content.contains(&"Sign in".to_string()));
    assert!(!analysis.text_content.contains(&"ok".to_string()), "fragments under 3 chars are dropped");
    assert!(analysis.summary().contains("type=WEB"));
}

#[test]
fn analyze_page_caps_structural_lists() {
    let many: String = (0..120).map(|i| format!("<div id=\"d{i}\">item {i}</div>")).collect();
    let analysis = analyze_page(&many);
    assert_eq!(analysis.container_elements.len(), 50);
    assert_eq!(analysis.elements_with_ids.len(), 100);
    assert_eq!(analysis.text_content.len(), 50);
}

#[test]
fn analyze_page_tolerates_garbage() {
    let analysis = analyze_page("<<<div class=\"x\" <input ><");
    assert_eq!(analysis.automation_type, AutomationType::Unknown);
    let empty = analyze_page("   ");
    assert!(empty.form_elements.is_empty());
    assert_eq!(empty.automation_type, AutomationType::Unknown);
}

#[test]
fn find_similar_elements_ranks_by_overlap() {
    let html = r#"<button class="btn">Other</button><button id="loginBtn" class="btn primary">Login</button>"#;
    let similar = find_similar_elements("//button[@id='loginBtn'][@class='btn primary']", html);
    assert!(!similar.is_empty());
    assert!(similar[0].contains("loginBtn"), "best match first: {:?}", similar);
    assert!(find_similar_elements("//*[@id='x']", html).is_empty(), "no tag, nothing to compare");
}

#[test]
fn extracts_attributes_from_xpath() {
    let attrs = LocatorAttributes::extract(
        "//button[@id='loginBtn' and @class='btn  primary' and @placeholder='Email' and text()='Sign in']",
    );
    assert!(attrs.ids.contains("loginBtn"));
    assert!(attrs.classes.contains("btn") && attrs.classes.contains("primary"));
    assert!(attrs.text_content.contains("Sign in"));
    assert!(attrs.tag_names.contains("button"));
    assert_eq!(attrs.other_attributes.get("placeholder").map(String::as_str), Some("Email"));
    assert!(!attrs.other_attributes.contains_key("id"));
    assert!(!attrs.other_attributes.contains_key("class"));
}

#[test]
fn extracts_resource_id_literal_and_parts() {
    let attrs = LocatorAttributes::extract("com.aranoah.healthkart.plus:id/search_image");
    assert!(attrs.resource_ids.contains("com.aranoah.healthkart.plus:id/search_image"));
    assert!(attrs.resource_id_parts.contains("search_image"));
    assert!(attrs.package_names.contains("com.aranoah.healthkart.plus"));
}

#[test]
fn extracts_android_classes_as_tags() {
    let attrs = LocatorAttributes::extract("//android.widget.TextView[@resource-id=\"com.app:id/title\" and @text='Cart']");
    assert!(attrs.tag_names.contains("textview"));
    assert!(!attrs.tag_names.contains("android"));
    assert!(attrs.resource_ids.contains("com.app:id/title"));
    assert!(attrs.text_content.contains("Cart"));
    assert!(attrs.package_names.contains("com.app"));
}

#[test]
fn extraction_is_total_for_free_text() {
    let attrs = LocatorAttributes::extract("just some words (( ]] @");
    assert!(attrs.is_empty());
    assert!(LocatorAttributes::extract("").is_empty());
}

#[test]
fn heal_targets_follow_precedence() {
    let t = HealTargets::extract("//*[@resource-id='com.app:id/go' and @text='Go']");
    assert_eq!(t.resource_id.as_deref(), Some("com.app:id/go"));
    assert_eq!(t.text_value.as_deref(), Some("Go"));

    let bare = HealTargets::extract("com.app:id/search_box");
    assert_eq!(bare.resource_id.as_deref(), Some("com.app:id/search_box"));

    let id = HealTargets::extract("//button[@id='loginBtn']");
    assert_eq!(id.id_attr.as_deref(), Some("loginBtn"));
    assert_eq!(id.resource_id, None);

    let free = HealTargets::extract("find \"Add to cart\" please");
    assert_eq!(free.text_value.as_deref(), Some("Add to cart"));

    let text_fn = HealTargets::extract("//span[text()=\"Telma 40 Tablet\"]");
    assert_eq!(text_fn.text_value.as_deref(), Some("Telma 40 Tablet"));
}

#[test]
fn always_returns_requested_chunk_count() {
    for source in ["", "   ", "a", "<a/>", ANDROID_DUMP] {
        let chunks = divide_into_chunks(source, 5);
        assert_eq!(chunks.len(), 5, "source {:?}", source);
        for (i, c) in chunks.iter().enumerate() { assert_eq!(c.ordinal_index, i); }
    }
    assert!(divide_into_chunks("", 5).iter().all(|c| c.content.is_empty()));
    assert_eq!(divide_into_chunks("<a/>", 0).len(), 1);
}

#[test]
fn chunks_cover_source_without_gaps() {
    let source: String = (0..40).map(|i| format!("<item id=\"i{i}\">value {i}</item>\n")).collect();
    let chunks = divide_into_chunks(&source, 5);
    let joined: String = chunks.iter().map(|c| c.content.as_str()).collect();
    assert_eq!(joined, source);
    for c in &chunks[..4] {
        assert!(c.content.ends_with('>'), "non-final chunks end after a tag: {:?}", &c.content[c.content.len().saturating_sub(20)..]);
    }
}

#[test]
fn chunking_counts_chars_not_bytes() {
    let source = "<p>héllo wörld ünïcödé</p>".repeat(20);
    let chunks = divide_into_chunks(&source, 5);
    let joined: String = chunks.iter().map(|c| c.content.as_str()).collect();
    assert_eq!(joined, source);
}

#[test]
fn sliding_chunks_respect_cap_and_size() {
    let source = "<row>abcdefghij</row>".repeat(200);
    let chunks = sliding_chunks(&source, 500, 50, 3);
    assert_eq!(chunks.len(), 3);
    assert!(chunks.iter().all(|c| c.char_len() <= 500));
    let single = sliding_chunks("<a/>", 500, 50, 10);
    assert_eq!(single.len(), 1);
    assert_eq!(single[0].content, "<a/>");
}

#[test]
fn sliding_chunks_trim_back_to_an_early_tag() {
    let source = format!("<a>{}", "x".repeat(1000));
    let chunks = sliding_chunks(&source, 500, 50, 10);
    assert_eq!(chunks[0].content, "<a>");
    assert_eq!(chunks[1].char_len(), 500, "windows without a tag stay whole");
    assert!(chunks.last().is_some_and(|c| c.content.ends_with('x')));
}

#[test]
fn truncation_stays_within_budget() {
    let source = "<node text=\"abc\"/>".repeat(500);
    let out = truncate_at_tag_boundary(&source, 1000);
    assert!(out.chars().count() <= 1000);
    assert!(out.ends_with(TRUNCATION_MARKER));
    assert!(out.trim_end_matches(TRUNCATION_MARKER).ends_with('>'));
    assert_eq!(truncate_at_tag_boundary("<a/>", 1000), "<a/>");
    assert_eq!(truncate_at_tag_boundary(&source, 5).chars().count(), 5);
    assert!(!truncate_at_tag_boundary(&source, 1).is_empty());
}

#[test]
fn heal_result_confidence_is_clamped() {
    assert_eq!(HealResult::new("a", "b", 1.7).confidence, 1.0);
    assert_eq!(HealResult::new("a", "b", -0.3).confidence, 0.0);
    assert_eq!(HealResult::new("a", "b", f64::NAN).confidence, 0.0);
    let unchanged = HealResult::unchanged("//x");
    assert_eq!(unchanged.healed_xpath, "//x");
    assert!(!unchanged.is_healed());
}

#[test]
fn context_stats_compute_ratio() {
    let stats = ContextStats::new(1000, 250);
    assert!((stats.compression_ratio_percent - 25.0).abs() < 1e-9);
    assert!((stats.compression_achieved() - 75.0).abs() < 1e-9);
    assert_eq!(ContextStats::new(0, 0).compression_ratio_percent, 0.0);
}

#[test]
fn loads_captures_from_directory() {
    let tmp = tempfile::TempDir::new().expect("tempdir");
    let dir = tmp.path();
    fs::create_dir_all(dir.join("android")).expect("mkdir");
    fs::write(dir.join("android/home.xml"), ANDROID_DUMP).expect("write");
    fs::write(dir.join("login.html"), "<html><body><button id='go'>Go</button></body></html>").expect("write");
    fs::write(dir.join("notes.txt"), "ignored").expect("write");

    let files = list_captures(dir);
    assert_eq!(files.len(), 2);

    let captures = load_captures(dir).expect("load");
    assert_eq!(captures.len(), 2);
    assert_eq!(captures[0].automation_type, AutomationType::MobileAndroid);
    assert_eq!(captures[1].automation_type, AutomationType::Web);

    assert!(read_page_source(&dir.join("missing.xml")).is_err());
    assert!(load_captures(&dir.join("android/home.xml")).expect("single file").len() == 1);
}
