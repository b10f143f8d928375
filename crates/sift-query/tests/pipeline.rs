use bson::{Bson, Document, doc};
use sift_query::*;

const FILTER: &str = r#"[
    {"label":"status","operation":"=","condition":["active","pending"]},
    {"label":"revenue","operation":">","condition":10000}
]"#;
const SORT: &str = r#"[{"db_name":"revenue","type":"des"},{"db_name":"name","type":"asc"}]"#;
const AGGREGATION: &str = r#"{
    "group_by": "region",
    "group_by_title": "region_name",
    "aggregators": [{"aggregate": "revenue", "operation": "sum"}]
}"#;

fn base() -> Document {
    doc! { "tenant": "acme", "deleted": false }
}

fn full_request(compiler: &Compiler) -> PipelineRequest {
    PipelineRequest {
        filter: Some(compiler.compile_filter(FILTER).unwrap()),
        projection: Some(Projection::new().include("name").include("revenue")),
        group: compiler.compile_aggregation(AGGREGATION).unwrap(),
        sort: Some(compiler.compile_sort(SORT).unwrap()),
        page: Some("3".into()),
        page_size: Some("25".into()),
    }
}

fn stage_names(compiled: &CompiledPipeline) -> Vec<&'static str> {
    compiled.stages.iter().map(Stage::name).collect()
}

// ── Stage order ─────────────────────────────────────────────────

#[test]
fn all_stages_present() {
    let compiler = Compiler::new();
    let compiled = compiler.assemble(&base(), &full_request(&compiler));
    assert_eq!(
        stage_names(&compiled),
        ["$match", "$match", "$project", "$group", "$sort", "$skip", "$limit"]
    );
    assert_eq!(compiled.stages[5], Stage::Skip(50));
    assert_eq!(compiled.stages[6], Stage::Limit(25));
}

#[test]
fn every_combination_of_optional_stages() {
    let compiler = Compiler::new();
    let full = full_request(&compiler);

    for mask in 0u8..16 {
        let request = PipelineRequest {
            filter: full.filter.clone().filter(|_| mask & 1 != 0),
            projection: full.projection.clone().filter(|_| mask & 2 != 0),
            group: full.group.clone().filter(|_| mask & 4 != 0),
            sort: full.sort.clone().filter(|_| mask & 8 != 0),
            page: None,
            page_size: None,
        };

        let mut expected = vec!["$match"];
        if mask & 1 != 0 {
            expected.push("$match");
        }
        if mask & 2 != 0 {
            expected.push("$project");
        }
        if mask & 4 != 0 {
            expected.push("$group");
        }
        if mask & 8 != 0 {
            expected.push("$sort");
        }
        expected.extend(["$skip", "$limit"]);

        let compiled = compiler.assemble(&base(), &request);
        assert_eq!(stage_names(&compiled), expected, "mask {mask:04b}");

        for stage in compiled.to_documents() {
            assert_eq!(stage.len(), 1);
            let (_, body) = stage.iter().next().unwrap();
            assert_ne!(body, &Bson::Null, "mask {mask:04b}");
        }
    }
}

#[test]
fn base_match_always_first() {
    let compiled = Compiler::new().assemble(&base(), &PipelineRequest::default());
    assert_eq!(compiled.stages[0], Stage::Match(base()));
}

// ── Count predicate ─────────────────────────────────────────────

#[test]
fn count_is_base_without_filter() {
    let compiled = Compiler::new().assemble(&base(), &PipelineRequest::default());
    assert_eq!(compiled.count, base());
}

#[test]
fn count_ands_base_with_filter() {
    let compiler = Compiler::new();
    let filter = compiler.compile_filter(FILTER).unwrap();
    let request = PipelineRequest {
        filter: Some(filter.clone()),
        ..Default::default()
    };

    let compiled = compiler.assemble(&base(), &request);
    assert_eq!(
        compiled.count,
        doc! { "$and": [base(), filter.to_document()] }
    );
    assert_eq!(compiled.stages[1], Stage::Match(filter.to_document()));
}

#[test]
fn match_all_filter_adds_no_stage() {
    let compiler = Compiler::new();
    let filter = compiler
        .compile_filter(r#"[{"label":"a","operation":"sounds like","condition":"x"}]"#)
        .unwrap();
    let request = PipelineRequest {
        filter: Some(filter),
        ..Default::default()
    };

    let compiled = compiler.assemble(&base(), &request);
    assert_eq!(stage_names(&compiled), ["$match", "$skip", "$limit"]);
    assert_eq!(compiled.count, base());
}

// ── Rendering ───────────────────────────────────────────────────

#[test]
fn rendered_documents() {
    let compiler = Compiler::new();
    let docs = compiler.assemble(&base(), &full_request(&compiler)).to_documents();

    assert_eq!(docs[0], doc! { "$match": base() });

    let and = docs[1].get_document("$match").unwrap().get_array("$and").unwrap();
    assert_eq!(
        and[0],
        Bson::Document(doc! { "status": { "$in": ["active", "pending"] } })
    );
    let revenue = and[1]
        .as_document()
        .unwrap()
        .get_document("revenue")
        .unwrap();
    assert!(matches!(
        revenue.get("$gt"),
        Some(Bson::Int32(10000) | Bson::Int64(10000))
    ));

    assert_eq!(docs[2], doc! { "$project": { "name": 1, "revenue": 1 } });
    assert_eq!(
        docs[3],
        doc! {
            "$group": {
                "_id": "$region",
                "group_by_title": { "$first": "$region_name" },
                "revenue": { "$sum": "$revenue" },
            }
        }
    );

    let sort = docs[4].get_document("$sort").unwrap();
    let keys: Vec<&String> = sort.keys().collect();
    assert_eq!(keys, ["revenue", "name"]);
    assert_eq!(sort.get_i32("revenue").unwrap(), -1);
    assert_eq!(sort.get_i32("name").unwrap(), 1);

    assert_eq!(docs[5], doc! { "$skip": 50_i64 });
    assert_eq!(docs[6], doc! { "$limit": 25_i64 });
}

// ── Idempotence ─────────────────────────────────────────────────

#[test]
fn compiling_twice_gives_identical_output() {
    let compiler = Compiler::with_resolver(StaticResolver::new().with("floor", 5000_i32));

    let first = compiler.compile_filter(FILTER).unwrap();
    let second = compiler.compile_filter(FILTER).unwrap();
    assert_eq!(first, second);

    assert_eq!(
        compiler.compile_sort(SORT).unwrap(),
        compiler.compile_sort(SORT).unwrap()
    );
    assert_eq!(
        compiler.compile_aggregation(AGGREGATION).unwrap(),
        compiler.compile_aggregation(AGGREGATION).unwrap()
    );

    let raw = RawRequest {
        filter: Some(FILTER.into()),
        sort: Some(SORT.into()),
        aggregation: Some(AGGREGATION.into()),
        page: Some("2".into()),
        ..Default::default()
    };
    let a = compiler.compile_request(&base(), &raw).unwrap();
    let b = compiler.compile_request(&base(), &raw).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.to_documents(), b.to_documents());
}

#[test]
fn compiler_is_shareable_across_threads() {
    let compiler = std::sync::Arc::new(Compiler::new());
    let handles: Vec<_> = (1..=4)
        .map(|page| {
            let compiler = compiler.clone();
            std::thread::spawn(move || {
                let raw = RawRequest {
                    filter: Some(FILTER.into()),
                    page: Some(page.to_string()),
                    ..Default::default()
                };
                compiler.compile_request(&base(), &raw).unwrap()
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let compiled = handle.join().unwrap();
        let skip = compiled.stages[compiled.stages.len() - 2].clone();
        assert_eq!(skip, Stage::Skip(i as i64 * 10));
    }
}
