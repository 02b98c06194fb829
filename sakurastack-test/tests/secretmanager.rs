//! Secret Manager integration tests over real HTTP

use rand::distributions::{Alphanumeric, Standard};
use rand::seq::SliceRandom;
use rand::Rng;
use sakurastack_test::{SecretMeta, TestServer};
use std::collections::HashSet;

fn meta(name: &str, latest_version: u64) -> SecretMeta {
    SecretMeta {
        name: name.to_string(),
        latest_version,
    }
}

#[tokio::test]
async fn test_create_list_unveil() {
    let server = TestServer::start().await.unwrap();
    let client = server.client("v1");

    let created = client.create("foo", "bar").await.unwrap();
    assert_eq!(created, meta("foo", 1));

    let page = client.list().await.unwrap();
    assert_eq!(page.secrets, vec![meta("foo", 1)]);

    let unveiled = client.unveil("foo", None).await.unwrap();
    assert_eq!(unveiled.value, "bar");
    assert_eq!(unveiled.version, 1);
}

#[tokio::test]
async fn test_new_version_keeps_old() {
    let server = TestServer::start().await.unwrap();
    let client = server.client("v1");

    client.create("foo", "bar").await.unwrap();
    assert_eq!(client.create("foo", "baz").await.unwrap().latest_version, 2);

    let v1 = client.unveil("foo", Some(1)).await.unwrap();
    assert_eq!((v1.value.as_str(), v1.version), ("bar", 1));

    let latest = client.unveil("foo", None).await.unwrap();
    assert_eq!((latest.value.as_str(), latest.version), ("baz", 2));
}

#[tokio::test]
async fn test_delete_removes_everything() {
    let server = TestServer::start().await.unwrap();
    let client = server.client("v1");

    client.create("foo", "bar").await.unwrap();
    client.create("foo", "baz").await.unwrap();
    client.delete("foo").await.unwrap();

    assert!(client.list().await.unwrap().secrets.is_empty());
    for version in [None, Some(1), Some(2)] {
        let err = client.unveil("foo", version).await.unwrap_err();
        assert_eq!(err.status(), Some(404));
    }
    assert_eq!(client.delete("foo").await.unwrap_err().status(), Some(404));

    // A recreated secret starts again at version 1
    assert_eq!(client.create("foo", "again").await.unwrap().latest_version, 1);
}

#[tokio::test]
async fn test_vault_isolation() {
    let server = TestServer::start().await.unwrap();
    let a = server.client("vault-a");
    let b = server.client("vault-b");

    b.create("shared-name", "b-value").await.unwrap();
    let before = b.list().await.unwrap().secrets;

    a.create("secret1", "value1").await.unwrap();
    a.create("shared-name", "a-value").await.unwrap();
    a.delete("shared-name").await.unwrap();

    assert_eq!(b.list().await.unwrap().secrets, before);
    assert_eq!(a.list().await.unwrap().secrets, vec![meta("secret1", 1)]);
    assert_eq!(b.unveil("shared-name", None).await.unwrap().value, "b-value");
    assert!(server.client("vault-c").list().await.unwrap().secrets.is_empty());
}

#[tokio::test]
async fn test_unveil_not_found_has_message() {
    let server = TestServer::start().await.unwrap();
    let client = server.client("v1");

    let err = client.unveil("nonexistent", None).await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert!(err.to_string().contains("nonexistent"));
}

#[tokio::test]
async fn test_list_sorted_regardless_of_insertion_order() {
    let server = TestServer::start().await.unwrap();
    let client = server.client("v1");
    let mut rng = rand::thread_rng();

    let mut names: Vec<String> = (0..20)
        .map(|_| (&mut rng).sample_iter(&Alphanumeric).take(12).map(char::from).collect())
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    names.shuffle(&mut rng);

    for name in &names {
        client.create(name, "x").await.unwrap();
    }

    let page = client.list().await.unwrap();
    names.sort();
    let listed: Vec<String> = page.secrets.into_iter().map(|s| s.name).collect();
    assert_eq!(listed, names);
    assert_eq!(page.count, names.len());
    assert_eq!(page.total, names.len());
    assert_eq!(page.from, 0);
}

#[tokio::test]
async fn test_random_values_round_trip() {
    let server = TestServer::start().await.unwrap();
    let client = server.client("v1");
    let mut rng = rand::thread_rng();

    let mut values: Vec<String> = vec![String::new(), "日本語のシークレット".to_string()];
    for _ in 0..20 {
        let len = rng.gen_range(0..200);
        values.push((&mut rng).sample_iter::<char, _>(Standard).take(len).collect());
    }

    for (i, value) in values.iter().enumerate() {
        let version = client.create("fuzz", value).await.unwrap().latest_version;
        assert_eq!(version, i as u64 + 1);
    }
    for (i, value) in values.iter().enumerate() {
        let unveiled = client.unveil("fuzz", Some(i as u64 + 1)).await.unwrap();
        assert_eq!(&unveiled.value, value);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_are_gapless() {
    let server = TestServer::start().await.unwrap();
    let writers: u64 = 8;
    let per_writer: u64 = 25;

    let tasks: Vec<_> = (0..writers)
        .map(|w| {
            let client = server.client("contended");
            tokio::spawn(async move {
                let mut written = Vec::new();
                for i in 0..per_writer {
                    let value = format!("writer-{w}-{i}");
                    let version = client.create("shared", &value).await.unwrap().latest_version;
                    written.push((version, value));
                }
                written
            })
        })
        .collect();

    let mut written = Vec::new();
    for task in tasks {
        written.extend(task.await.unwrap());
    }
    written.sort();

    let versions: Vec<u64> = written.iter().map(|(v, _)| *v).collect();
    let expected: Vec<u64> = (1..=writers * per_writer).collect();
    assert_eq!(versions, expected);

    // Every version holds exactly the value whose write returned it
    let client = server.client("contended");
    for (version, value) in &written {
        let unveiled = client.unveil("shared", Some(*version)).await.unwrap();
        assert_eq!(&unveiled.value, value);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_readers_never_see_torn_writes() {
    let server = TestServer::start().await.unwrap();
    let writer = server.client("v1");
    writer.create("counter", "1").await.unwrap();

    let reader = server.client("v1");
    let reads = tokio::spawn(async move {
        for _ in 0..100 {
            let unveiled = reader.unveil("counter", None).await.unwrap();
            assert_eq!(unveiled.value, unveiled.version.to_string());
        }
    });

    for n in 2..=50u64 {
        writer.create("counter", &n.to_string()).await.unwrap();
    }
    reads.await.unwrap();
}

#[tokio::test]
async fn test_custom_prefix_and_stop() {
    let mut server = TestServer::start_with_prefix("/custom").await.unwrap();
    assert!(server.api_root_url().ends_with("/custom"));

    let client = server.client("v1");
    client.create("foo", "bar").await.unwrap();
    assert_eq!(client.unveil("foo", None).await.unwrap().value, "bar");

    server.stop().await;
    assert!(client.list().await.is_err());
}
