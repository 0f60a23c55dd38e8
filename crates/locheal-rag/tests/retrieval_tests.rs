use std::fs;

use locheal_core::chunker::divide_into_chunks;
use locheal_core::config::{Config, RetrievalConfig, RetrievalStrategy};
use locheal_core::types::{Chunk, LocatorAttributes};
use locheal_rag::{find_most_relevant_chunk, score_fixed, score_weighted, RetrievalEngine, CHUNK_SEPARATOR};

const TARGET: &str = "com.app:id/search_image";

fn filler(i: usize) -> String {
    format!(r#"<node index="{i}" text="Row {i:03}" resource-id="org.list:id/row_{i:03}" class="android.widget.TextView" bounds="[0,{i}][9,{i}]"/>"#)
}

/// Five equally sized segments of ten nodes; the target sits in the middle of the third.
fn android_page() -> String {
    let mut page = String::from("<hierarchy>");
    for i in 0..50 {
        if i == 25 {
            page.push_str(r#"<node index="25" text="Search" resource-id="com.app:id/search_image" class="android.widget.ImageView" bounds="[0,25][9,25]"/>"#);
        } else {
            page.push_str(&filler(i));
        }
    }
    page.push_str("</hierarchy>");
    page
}

fn budgeted(max_context_length: usize) -> RetrievalConfig {
    RetrievalConfig { strategy: RetrievalStrategy::Budgeted, max_context_length, ..RetrievalConfig::default() }
}

#[test]
fn resource_id_in_middle_chunk_wins() {
    let page = android_page();
    let chunks = divide_into_chunks(&page, 5);
    assert!(chunks[2].content.contains(TARGET));
    assert!(chunks.iter().filter(|c| c.content.contains(TARGET)).count() == 1);

    let best = find_most_relevant_chunk(&chunks, &LocatorAttributes::extract(TARGET), TARGET);
    assert_eq!(best.chunk.ordinal_index, 2);
    assert!(best.score >= 8.0, "score {}", best.score);
}

#[test]
fn fixed_score_counts_each_signal() {
    let chunk = Chunk::new(r#"<button id="loginBtn" class="btn primary">Login</button>"#, 0);
    let attrs = LocatorAttributes::extract("//button[@id='loginBtn']");
    // raw locator absent, id 6, tag 2, class= marker 0.5
    assert_eq!(score_fixed(&chunk, &attrs, "//button[@id='loginBtn']"), 8.5);
    assert_eq!(score_fixed(&chunk, &attrs, "loginBtn"), 18.5, "raw locator substring adds 10");
    assert_eq!(score_fixed(&chunk, &attrs, "LOGINBTN"), 8.5, "raw locator test is case-sensitive");
    assert_eq!(score_fixed(&Chunk::new("  ", 0), &attrs, "loginBtn"), 0.0);
}

#[test]
fn ties_go_to_the_lowest_index() {
    let chunks: Vec<Chunk> = (0..5).map(|i| Chunk::new("<a id=\"x\"/>", i)).collect();
    let best = find_most_relevant_chunk(&chunks, &LocatorAttributes::extract("//a[@id='x']"), "//a[@id='x']");
    assert_eq!(best.chunk.ordinal_index, 0);
}

#[test]
fn zero_scores_fall_back_to_middle_then_first_non_blank() {
    let attrs = LocatorAttributes::extract("//zzz[@id='nothing']");
    let chunks: Vec<Chunk> = (0..5).map(|i| Chunk::new(format!("<p>{i}</p>"), i)).collect();
    let best = find_most_relevant_chunk(&chunks, &attrs, "nothing-here");
    assert_eq!(best.chunk.ordinal_index, 2);
    assert_eq!(best.score, 0.0);

    let mut sparse: Vec<Chunk> = (0..5).map(|i| Chunk::new("", i)).collect();
    sparse[4] = Chunk::new("<p>tail</p>", 4);
    let best = find_most_relevant_chunk(&sparse, &attrs, "nothing-here");
    assert_eq!(best.chunk.ordinal_index, 4);
    assert!(!best.chunk.is_blank());

    let blank: Vec<Chunk> = (0..5).map(|i| Chunk::new("", i)).collect();
    assert!(find_most_relevant_chunk(&blank, &attrs, "x").chunk.is_blank());
    assert!(find_most_relevant_chunk(&[], &attrs, "x").chunk.is_blank());
}

#[test]
fn weighted_score_uses_config_weights() {
    let config = RetrievalConfig::default();
    let attrs = LocatorAttributes::extract("//button[@id='go' and @data-test='submit']");
    let chunk = Chunk::new(r#"<button id="go" data-test="submit">Go</button>"#, 0);
    // id 3.0 + tag 1.0 + other 1.0
    assert!((score_weighted(&chunk, &attrs, &config) - 5.0).abs() < 1e-9);

    let heavy = RetrievalConfig { id_match_weight: 10.0, ..RetrievalConfig::default() };
    assert!((score_weighted(&chunk, &attrs, &heavy) - 12.0).abs() < 1e-9);
}

#[test]
fn single_best_context_is_bounded_and_relevant() {
    let page = android_page();
    let engine = RetrievalEngine::default();
    let context = engine.retrieve_relevant_context(TARGET, &page);
    assert!(context.contains(TARGET));
    assert!(context.chars().count() < page.chars().count());

    let tight = RetrievalEngine::new(RetrievalConfig { max_context_length: 300, ..RetrievalConfig::default() });
    let context = tight.retrieve_relevant_context(TARGET, &page);
    assert!(!context.trim().is_empty());
    assert!(context.chars().count() <= 300);
}

#[test]
fn disabled_retrieval_only_truncates() {
    let page = android_page();
    let engine = RetrievalEngine::new(RetrievalConfig { enabled: false, max_context_length: 10_000, ..RetrievalConfig::default() });
    assert_eq!(engine.retrieve_relevant_context(TARGET, &page), page);
}

#[test]
fn budgeted_context_keeps_relevant_chunks_in_budget() {
    let page = android_page();
    let engine = RetrievalEngine::new(budgeted(1200));
    let context = engine.retrieve_relevant_context(TARGET, &page);
    assert!(context.contains(TARGET));
    assert!(context.chars().count() <= 1200);
}

#[test]
fn budgeted_context_falls_back_when_nothing_is_relevant() {
    let page = android_page();
    let picky = RetrievalEngine::new(RetrievalConfig { relevance_threshold: 1_000.0, ..budgeted(1200) });
    let context = picky.retrieve_relevant_context(TARGET, &page);
    assert!(context.starts_with("<hierarchy>"), "leading chunks are used");
    assert!(context.chars().count() <= 1200);
    assert!(!context.contains(CHUNK_SEPARATOR));

    let tiny = RetrievalEngine::new(RetrievalConfig { relevance_threshold: 1_000.0, ..budgeted(60) });
    let context = tiny.retrieve_relevant_context(TARGET, &page);
    assert!(!context.trim().is_empty());
    assert!(context.chars().count() <= 60);
}

#[test]
fn blank_input_gives_blank_context() {
    let engine = RetrievalEngine::default();
    assert_eq!(engine.retrieve_relevant_context(TARGET, ""), "");
    assert!(!engine.validate_output(TARGET, "   "));
    assert!(engine.validate_output(TARGET, &android_page()));
}

#[test]
fn context_stats_measure_returned_context() {
    let page = android_page();
    let engine = RetrievalEngine::default();
    let stats = engine.get_context_stats(TARGET, &page);
    let context = engine.retrieve_relevant_context(TARGET, &page);
    assert_eq!(stats.original_length, page.chars().count());
    assert_eq!(stats.optimized_length, context.chars().count());
    assert!(stats.compression_ratio_percent > 0.0 && stats.compression_ratio_percent < 100.0);
    assert!(stats.compression_achieved() > 0.0);
}

#[test]
fn report_serializes_run_summary() {
    let page = android_page();
    let report = RetrievalEngine::default().report(TARGET, &page);
    assert!(report.success);
    assert_eq!(report.chunks_analyzed, 5);
    assert!(report.relevant_chunks_found >= 1);

    let json = serde_json::to_value(&report).expect("json");
    assert_eq!(json["automation_type"], "MOBILE_ANDROID");
    assert_eq!(json["strategy"], "single_best");
    assert_eq!(json["locator"], TARGET);
}

#[test]
fn engine_reads_retrieval_section_from_config_file() {
    let tmp = tempfile::TempDir::new().expect("tempdir");
    fs::write(
        tmp.path().join("locheal.toml"),
        "[retrieval]\nstrategy = \"budgeted\"\nmax_context_length = 2000\n\n[healer]\nsimilarity_threshold = 0.4\n",
    )
    .expect("write config");

    let config = Config::load_from(tmp.path()).expect("load");
    let engine = RetrievalEngine::from_config(&config).expect("engine");
    assert_eq!(engine.config().strategy, RetrievalStrategy::Budgeted);
    assert_eq!(engine.config().max_context_length, 2000);
    assert_eq!(engine.config().chunk_size, 500, "unset fields keep defaults");
    assert!((config.healer().expect("healer").similarity_threshold - 0.4).abs() < 1e-9);
}

#[test]
fn invalid_retrieval_config_is_rejected() {
    let tmp = tempfile::TempDir::new().expect("tempdir");
    fs::write(tmp.path().join("locheal.toml"), "[retrieval]\nchunk_size = 100\noverlap_size = 100\n").expect("write config");
    assert!(Config::load_from(tmp.path()).is_err());
}
