//! End-to-end engine scenarios over the in-memory store.

use std::collections::BTreeMap;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use grove::{
    DocStore, Grove, GroveError, InMemoryStore, Namespace, Order, PaginateArgs, Value,
};

fn num(n: f64) -> Value {
    Value::Number(n)
}

fn ns(name: &str) -> Namespace {
    Some(Value::String(name.to_string()))
}

fn as_num(value: &Value) -> f64 {
    match value {
        Value::Number(n) => *n,
        other => panic!("expected a number key, got {other:?}"),
    }
}

async fn setup(fanout: usize, namespace: &Namespace) -> (Arc<InMemoryStore>, Grove<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    let grove = Grove::new(Arc::clone(&store));
    grove.init(namespace, Some(fanout)).await.unwrap();
    (store, grove)
}

async fn insert_nums(grove: &Grove<InMemoryStore>, namespace: &Namespace, keys: &[f64]) {
    for &k in keys {
        grove.insert(namespace, num(k), format!("id{k}")).await.unwrap();
    }
}

/// Full walk by repeated pagination with a propagated cursor.
async fn collect_keys(
    grove: &Grove<InMemoryStore>,
    namespace: &Namespace,
    order: Order,
    page_size: usize,
) -> Vec<f64> {
    let mut out = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let mut args = PaginateArgs::new(page_size, order);
        args.cursor = cursor;
        let page = grove.paginate(namespace, args).await.unwrap();
        out.extend(page.page.iter().map(|item| as_num(&item.k)));
        if page.is_done {
            assert_eq!(page.cursor, "");
            break;
        }
        cursor = Some(page.cursor);
    }
    out
}

#[tokio::test]
async fn mixed_inserts_build_a_balanced_two_level_tree() {
    let namespace = ns("s1");
    let (store, grove) = setup(4, &namespace).await;
    insert_nums(
        &grove,
        &namespace,
        &[10.0, 20.0, 5.0, 6.0, 12.0, 30.0, 7.0, 17.0, 8.0, 4.0, 3.0, 9.0],
    )
    .await;

    let walked = collect_keys(&grove, &namespace, Order::Asc, 5).await;
    assert_eq!(
        walked,
        vec![3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 12.0, 17.0, 20.0, 30.0]
    );
    grove.validate(&namespace).await.unwrap();
    // One root over three leaves: height two.
    assert_eq!(store.node_count().await, 4);
}

#[tokio::test]
async fn delete_of_an_internal_key_uses_the_predecessor() {
    let namespace = ns("s2");
    let (_store, grove) = setup(4, &namespace).await;
    insert_nums(
        &grove,
        &namespace,
        &[10.0, 20.0, 5.0, 6.0, 12.0, 30.0, 7.0, 17.0, 8.0, 4.0, 3.0, 9.0],
    )
    .await;

    let removed = grove.delete(&namespace, &num(6.0)).await.unwrap();
    assert_eq!(as_num(&removed.k), 6.0);

    let walked = collect_keys(&grove, &namespace, Order::Asc, 4).await;
    assert_eq!(
        walked,
        vec![3.0, 4.0, 5.0, 7.0, 8.0, 9.0, 10.0, 12.0, 17.0, 20.0, 30.0]
    );
    grove.validate(&namespace).await.unwrap();
}

#[tokio::test]
async fn ascending_pagination_pages_through_everything() {
    let namespace = ns("s3");
    let (_store, grove) = setup(4, &namespace).await;
    insert_nums(&grove, &namespace, &(1..=20).map(f64::from).collect::<Vec<_>>()).await;

    let mut cursor: Option<String> = None;
    let mut pages = Vec::new();
    loop {
        let mut args = PaginateArgs::new(5, Order::Asc);
        args.cursor = cursor;
        let page = grove.paginate(&namespace, args).await.unwrap();
        pages.push(page.page.iter().map(|item| as_num(&item.k)).collect::<Vec<_>>());
        if page.is_done {
            break;
        }
        cursor = Some(page.cursor);
    }
    assert_eq!(pages.len(), 4);
    assert_eq!(pages[0], vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    assert_eq!(pages[1], vec![6.0, 7.0, 8.0, 9.0, 10.0]);
    assert_eq!(pages[2], vec![11.0, 12.0, 13.0, 14.0, 15.0]);
    assert_eq!(pages[3], vec![16.0, 17.0, 18.0, 19.0, 20.0]);
}

#[tokio::test]
async fn descending_pagination_respects_bounds() {
    let namespace = ns("s4");
    let (_store, grove) = setup(4, &namespace).await;
    insert_nums(&grove, &namespace, &(1..=20).map(f64::from).collect::<Vec<_>>()).await;

    let mut args = PaginateArgs::new(7, Order::Desc);
    args.k1 = Some(num(5.0));
    args.k2 = Some(num(15.0));
    let first = grove.paginate(&namespace, args.clone()).await.unwrap();
    assert_eq!(
        first.page.iter().map(|item| as_num(&item.k)).collect::<Vec<_>>(),
        vec![15.0, 14.0, 13.0, 12.0, 11.0, 10.0, 9.0]
    );
    assert!(!first.is_done);

    args.cursor = Some(first.cursor);
    let second = grove.paginate(&namespace, args).await.unwrap();
    assert_eq!(
        second.page.iter().map(|item| as_num(&item.k)).collect::<Vec<_>>(),
        vec![8.0, 7.0, 6.0, 5.0]
    );
    assert!(second.is_done);
}

#[tokio::test]
async fn duplicate_insert_fails_and_upsert_overwrites() {
    let namespace = ns("s5");
    let (_store, grove) = setup(4, &namespace).await;
    let key = Value::String("x".to_string());

    grove.insert(&namespace, key.clone(), "a").await.unwrap();
    let duplicate = grove.insert(&namespace, key.clone(), "b").await;
    assert!(matches!(duplicate, Err(GroveError::DuplicateKey(_))));

    grove
        .replace_or_insert(&namespace, &key, key.clone(), "b", None)
        .await
        .unwrap();
    let found = grove.get(&namespace, &key).await.unwrap().unwrap();
    assert_eq!(found.v, "b");
    assert_eq!(found.k, key);
}

#[tokio::test]
async fn clear_all_empties_namespaces_and_keeps_the_default_fanout() {
    let store = Arc::new(InMemoryStore::new());
    let grove = Grove::new(Arc::clone(&store));

    grove.init(&None, Some(6)).await.unwrap();
    for name in ["a", "b", "c"] {
        insert_nums(&grove, &ns(name), &[1.0, 2.0, 3.0]).await;
    }
    insert_nums(&grove, &None, &[9.0]).await;

    grove.clear_all().await.unwrap();

    for name in ["a", "b", "c"] {
        assert!(collect_keys(&grove, &ns(name), Order::Asc, 10).await.is_empty());
    }
    assert!(collect_keys(&grove, &None, Order::Asc, 10).await.is_empty());
    let undefined_tree = store.find_tree(&None).await.unwrap().unwrap();
    assert_eq!(undefined_tree.max_node_size, 6);
}

#[tokio::test]
async fn ascending_overflow_splits_on_the_middle_key() {
    let namespace = ns("boundary");
    let (store, grove) = setup(4, &namespace).await;
    insert_nums(&grove, &namespace, &[1.0, 2.0, 3.0, 4.0, 5.0]).await;

    let tree = store.find_tree(&namespace).await.unwrap().unwrap();
    let root = store.get_node(&tree.root).await.unwrap().unwrap();
    assert_eq!(root.items.len(), 1);
    assert_eq!(as_num(&root.items[0].k), 3.0);
    assert_eq!(root.subtrees.len(), 2);
    grove.validate(&namespace).await.unwrap();
}

#[tokio::test]
async fn delete_on_an_empty_tree_reports_missing_key() {
    let store = Arc::new(InMemoryStore::new());
    let grove = Grove::new(store);
    // The namespace has never been touched: the write auto-creates an
    // empty tree, then misses.
    let missing = grove.delete(&ns("fresh"), &num(1.0)).await;
    assert!(matches!(missing, Err(GroveError::MissingKey(_))));
    assert_eq!(
        grove.delete_if_exists(&ns("fresh"), &num(1.0)).await.unwrap(),
        None
    );
}

#[tokio::test]
async fn odd_or_tiny_fanouts_are_rejected() {
    let store = Arc::new(InMemoryStore::new());
    let grove = Grove::new(store);
    for bad in [2, 3, 5, 7] {
        let result = grove.init(&ns("bad"), Some(bad)).await;
        assert!(
            matches!(result, Err(GroveError::InvalidFanout(b)) if b == bad),
            "fanout {bad}"
        );
    }
}

#[tokio::test]
async fn zero_limits_are_rejected() {
    let namespace = ns("limits");
    let (_store, grove) = setup(4, &namespace).await;
    let zero_page = grove.paginate(&namespace, PaginateArgs::new(0, Order::Asc)).await;
    assert!(matches!(zero_page, Err(GroveError::InvalidLimit(0))));
    let zero_namespaces = grove.paginate_namespaces(0, None).await;
    assert!(matches!(zero_namespaces, Err(GroveError::InvalidLimit(0))));
}

#[tokio::test]
async fn cursor_sentinels_start_and_end_walks() {
    let namespace = ns("sentinels");
    let (_store, grove) = setup(4, &namespace).await;
    insert_nums(&grove, &namespace, &[1.0, 2.0]).await;

    // "" starts a fresh walk, exactly like no cursor at all.
    let mut args = PaginateArgs::new(10, Order::Asc);
    args.cursor = Some(String::new());
    let page = grove.paginate(&namespace, args).await.unwrap();
    assert_eq!(page.page.len(), 2);
    assert!(page.is_done);

    // "endcursor" ends namespace pagination immediately.
    let ended = grove
        .paginate_namespaces(10, Some("endcursor".to_string()))
        .await
        .unwrap();
    assert!(ended.page.is_empty());
    assert!(ended.is_done);
}

#[tokio::test]
async fn reads_on_an_uninitialized_namespace_distinguish_absent_from_empty() {
    let namespace = ns("reads");
    let (_store, grove) = setup(4, &namespace).await;

    let untouched = grove.get(&ns("other"), &num(1.0)).await;
    assert!(matches!(untouched, Err(GroveError::NotInitialized)));

    // An initialized-but-empty tree answers instead of failing.
    assert_eq!(grove.get(&namespace, &num(1.0)).await.unwrap(), None);
    let page = grove
        .paginate(&ns("other"), PaginateArgs::new(5, Order::Asc))
        .await
        .unwrap();
    assert!(page.page.is_empty());
    assert!(page.is_done);
}

#[tokio::test]
async fn explicit_init_refuses_an_existing_tree() {
    let namespace = ns("init");
    let (_store, grove) = setup(4, &namespace).await;
    let again = grove.init(&namespace, None).await;
    assert!(matches!(again, Err(GroveError::AlreadyInitialized)));
}

#[tokio::test]
async fn namespace_catalog_pages_by_tree_id() {
    let store = Arc::new(InMemoryStore::new());
    let grove = Grove::new(Arc::clone(&store));
    grove.init(&None, None).await.unwrap();
    for name in ["a", "b", "c", "d"] {
        grove.init(&ns(name), None).await.unwrap();
    }

    let first = grove.paginate_namespaces(2, None).await.unwrap();
    assert_eq!(
        first.page,
        vec![Value::Null, Value::String("a".to_string())]
    );
    assert!(!first.is_done);

    let second = grove
        .paginate_namespaces(2, Some(first.cursor))
        .await
        .unwrap();
    assert_eq!(
        second.page,
        vec![Value::String("b".to_string()), Value::String("c".to_string())]
    );
    assert!(!second.is_done);

    let third = grove
        .paginate_namespaces(2, Some(second.cursor))
        .await
        .unwrap();
    assert_eq!(third.page, vec![Value::String("d".to_string())]);
    assert!(third.is_done);
    assert_eq!(third.cursor, "endcursor");
}

#[tokio::test]
async fn clear_purges_the_old_node_graph_one_node_at_a_time() {
    let namespace = ns("purge");
    let (store, grove) = setup(4, &namespace).await;
    insert_nums(&grove, &namespace, &(1..=50).map(f64::from).collect::<Vec<_>>()).await;
    let populated = store.node_count().await;
    assert!(populated > 10);

    grove.clear(&namespace, None).await.unwrap();

    // Drain the deferred work queue, re-delivering the first job to
    // exercise idempotency.
    let first = store.pop_purge().await.unwrap();
    grove.purge_node(&first).await.unwrap();
    grove.purge_node(&first).await.unwrap();
    while let Some(job) = store.pop_purge().await {
        grove.purge_node(&job).await.unwrap();
    }

    // Only the fresh empty root remains.
    assert_eq!(store.node_count().await, 1);
    assert!(collect_keys(&grove, &namespace, Order::Asc, 10).await.is_empty());
    grove.validate(&namespace).await.unwrap();
}

#[tokio::test]
async fn replace_can_move_an_item_across_namespaces() {
    let source = ns("accounts-us");
    let target = ns("accounts-eu");
    let (_store, grove) = setup(4, &source).await;
    grove.init(&target, Some(4)).await.unwrap();

    grove.insert(&source, num(7.0), "acct7").await.unwrap();
    grove
        .replace(&source, &num(7.0), num(7.0), "acct7", Some(&target))
        .await
        .unwrap();

    assert_eq!(grove.get(&source, &num(7.0)).await.unwrap(), None);
    let moved = grove.get(&target, &num(7.0)).await.unwrap().unwrap();
    assert_eq!(moved.v, "acct7");

    let gone = grove
        .replace(&source, &num(7.0), num(8.0), "acct7", None)
        .await;
    assert!(matches!(gone, Err(GroveError::MissingKey(_))));
}

#[tokio::test]
async fn insert_then_delete_restores_the_key_set() {
    let namespace = ns("roundtrip");
    let (_store, grove) = setup(4, &namespace).await;
    insert_nums(&grove, &namespace, &(1..=30).map(f64::from).collect::<Vec<_>>()).await;
    let before = collect_keys(&grove, &namespace, Order::Asc, 7).await;

    grove.insert(&namespace, num(15.5), "extra").await.unwrap();
    grove.delete(&namespace, &num(15.5)).await.unwrap();

    let after = collect_keys(&grove, &namespace, Order::Asc, 7).await;
    assert_eq!(before, after);
    grove.validate(&namespace).await.unwrap();
}

#[tokio::test]
async fn cursors_survive_interleaved_writes() {
    let namespace = ns("stable");
    let (_store, grove) = setup(4, &namespace).await;
    insert_nums(&grove, &namespace, &(1..=10).map(f64::from).collect::<Vec<_>>()).await;

    let first = grove
        .paginate(&namespace, PaginateArgs::new(3, Order::Asc))
        .await
        .unwrap();
    assert_eq!(
        first.page.iter().map(|item| as_num(&item.k)).collect::<Vec<_>>(),
        vec![1.0, 2.0, 3.0]
    );

    // Mutate around the cursor between pages.
    grove.insert(&namespace, num(0.5), "early").await.unwrap();
    grove.insert(&namespace, num(3.5), "mid").await.unwrap();
    grove.delete(&namespace, &num(2.0)).await.unwrap();

    let mut args = PaginateArgs::new(100, Order::Asc);
    args.cursor = Some(first.cursor);
    let rest = grove.paginate(&namespace, args).await.unwrap();
    assert_eq!(
        rest.page.iter().map(|item| as_num(&item.k)).collect::<Vec<_>>(),
        vec![3.5, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0]
    );
    assert!(rest.is_done);
}

#[tokio::test]
async fn descending_full_walk_is_the_reverse_of_ascending() {
    let namespace = ns("mirror");
    let (_store, grove) = setup(4, &namespace).await;
    insert_nums(
        &grove,
        &namespace,
        &[8.0, 1.0, 6.0, 3.0, 9.0, 2.0, 7.0, 5.0, 4.0],
    )
    .await;
    let asc = collect_keys(&grove, &namespace, Order::Asc, 2).await;
    let mut desc = collect_keys(&grove, &namespace, Order::Desc, 2).await;
    desc.reverse();
    assert_eq!(asc, desc);
}

#[tokio::test]
async fn upsert_ignores_prior_state() {
    let namespace = ns("upsert");
    let (_store, grove) = setup(4, &namespace).await;

    // delete(k) then upsert(k) behaves exactly like the upsert alone.
    grove.insert(&namespace, num(2.0), "two").await.unwrap();
    grove.delete(&namespace, &num(2.0)).await.unwrap();
    grove
        .insert_if_does_not_exist(&namespace, num(2.0), "two'")
        .await
        .unwrap();
    assert_eq!(
        grove.get(&namespace, &num(2.0)).await.unwrap().unwrap().v,
        "two'"
    );

    // Upsert over a live key lands the new value.
    grove
        .insert_if_does_not_exist(&namespace, num(2.0), "two''")
        .await
        .unwrap();
    assert_eq!(
        grove.get(&namespace, &num(2.0)).await.unwrap().unwrap().v,
        "two''"
    );
    grove.validate(&namespace).await.unwrap();
}

#[tokio::test]
async fn randomized_workload_matches_an_in_memory_oracle() {
    let namespace = ns("oracle");
    let (_store, grove) = setup(4, &namespace).await;
    let mut oracle: BTreeMap<i64, String> = BTreeMap::new();
    let mut rng = StdRng::seed_from_u64(0x5eed);

    for step in 0..600u32 {
        let key = rng.gen_range(0..80i64);
        let value = format!("v{step}");
        if oracle.contains_key(&key) {
            if rng.gen_bool(0.5) {
                grove.delete(&namespace, &num(key as f64)).await.unwrap();
                oracle.remove(&key);
            } else {
                grove
                    .replace_or_insert(&namespace, &num(key as f64), num(key as f64), &*value, None)
                    .await
                    .unwrap();
                oracle.insert(key, value);
            }
        } else {
            grove
                .insert(&namespace, num(key as f64), &*value)
                .await
                .unwrap();
            oracle.insert(key, value);
        }

        if step % 40 == 0 {
            grove.validate(&namespace).await.unwrap();
            let got = grove.get(&namespace, &num(key as f64)).await.unwrap();
            assert_eq!(got.map(|item| item.v), oracle.get(&key).cloned());
        }
    }

    grove.validate(&namespace).await.unwrap();
    let mut walked: Vec<(i64, String)> = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let mut args = PaginateArgs::new(13, Order::Asc);
        args.cursor = cursor;
        let page = grove.paginate(&namespace, args).await.unwrap();
        walked.extend(
            page.page
                .iter()
                .map(|item| (as_num(&item.k) as i64, item.v.clone())),
        );
        if page.is_done {
            break;
        }
        cursor = Some(page.cursor);
    }
    let expected: Vec<(i64, String)> =
        oracle.iter().map(|(k, v)| (*k, v.clone())).collect();
    assert_eq!(walked, expected);
}
