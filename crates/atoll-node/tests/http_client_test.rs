//! HTTP node client tests against a mock storage node

use atoll_node::{CrdtOp, HttpNodeClient, NodeClient, NodeConfig};
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> HttpNodeClient {
    let addr = server.address();
    HttpNodeClient::new(NodeConfig::new(addr.ip().to_string(), addr.port())).unwrap()
}

#[test_log::test(tokio::test)]
async fn test_read_map_returns_entries() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/map"))
        .and(query_param("keyspace", "storage/photos"))
        .and(query_param("key", "photos/md"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entries": { "owner": "alice", "acl": { "grants": [] } }
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let map = client.read_map("storage/photos", "photos/md").await.unwrap();

    assert_eq!(map.len(), 2);
    assert_eq!(map.get("owner"), Some(&json!("alice")));
}

#[tokio::test]
async fn test_read_map_absent_is_empty() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/map"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let map = client.read_map("storage/ghost", "ghost/md").await.unwrap();
    assert!(map.is_empty());
}

#[tokio::test]
async fn test_read_set_returns_members() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/set"))
        .and(query_param("key", "photos/objs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "members": ["a.jpg", "b.jpg"]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let members = client.read_set("storage/photos", "photos/objs").await.unwrap();
    assert_eq!(members, vec!["a.jpg".to_string(), "b.jpg".to_string()]);
}

#[tokio::test]
async fn test_update_posts_batch() {
    let server = MockServer::start().await;

    let batch = vec![
        CrdtOp::SetRegister {
            keyspace: "storage/photos".to_string(),
            map: "a.jpg".to_string(),
            field: "content-length".to_string(),
            value: json!(512),
        },
        CrdtOp::AddElement {
            keyspace: "storage/photos".to_string(),
            set: "photos/objs".to_string(),
            member: "a.jpg".to_string(),
        },
    ];

    Mock::given(method("POST"))
        .and(path("/v1/update"))
        .and(body_json(json!({
            "ops": [
                {
                    "op": "set_register",
                    "keyspace": "storage/photos",
                    "map": "a.jpg",
                    "field": "content-length",
                    "value": 512
                },
                {
                    "op": "add_element",
                    "keyspace": "storage/photos",
                    "set": "photos/objs",
                    "member": "a.jpg"
                }
            ]
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.update(batch).await.unwrap();
}

#[tokio::test]
async fn test_update_rejected_is_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/update"))
        .respond_with(ResponseTemplate::new(500).set_body_string("disk full"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.update(Vec::new()).await.unwrap_err();
    assert!(!err.is_unreachable());
    assert!(err.to_string().contains("disk full"));
}

#[tokio::test]
async fn test_connection_refused_classified_unreachable() {
    // Nothing listens on port 1
    let client = HttpNodeClient::new(NodeConfig::new("127.0.0.1", 1)).unwrap();
    let err = client.ping().await.unwrap_err();
    assert!(err.is_unreachable());
}
