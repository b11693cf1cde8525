//! Pagination completeness: sequential page walks reassemble the full
//! listing against a frozen backend.

mod common;

use common::*;
use serde_json::json;

#[tokio::test]
async fn sequential_pages_concatenate_to_the_unpaged_result() {
    let server = test_server();
    for i in 0..23 {
        seed_user(&server, &json!({"userName": format!("user{i:02}")})).await;
    }

    let unpaged = json_body(&get(&server, "/Users?sortBy=userName&count=100").await);
    let all: Vec<String> = unpaged["Resources"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["userName"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(all.len(), 23);

    let mut walked = Vec::new();
    let mut start_index = 1;
    loop {
        let uri = format!("/Users?sortBy=userName&startIndex={start_index}&count=5");
        let body = json_body(&get(&server, &uri).await);
        assert_eq!(body["totalResults"], 23);
        assert_eq!(body["startIndex"], start_index);
        let page = body["Resources"].as_array().unwrap();
        if page.is_empty() {
            break;
        }
        assert!(page.len() <= 5);
        walked.extend(
            page.iter()
                .map(|r| r["userName"].as_str().unwrap().to_string()),
        );
        start_index += page.len();
    }
    assert_eq!(walked, all);
}

#[tokio::test]
async fn count_zero_returns_totals_only() {
    let server = test_server();
    for name in ["alice", "bob", "carol"] {
        seed_user(&server, &json!({"userName": name})).await;
    }
    let body = json_body(&get(&server, "/Users?count=0").await);
    assert_eq!(body["totalResults"], 3);
    assert_eq!(body["itemsPerPage"], 0);
}
