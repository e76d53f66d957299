//! Filter language through list queries

use areadb::query::{evaluate, QueryError};
use areadb::{Db, DbConfig, ErrorKind, MemoryStore, Session};
use serde_json::{json, Value};

async fn people() -> areadb::Result<(Db, Session)> {
    let db = Db::new(Box::new(MemoryStore::new()), DbConfig::default());
    let session = db.issue_token("user1", 60).await?.session;
    for person in [
        json!({"name": "Alice", "age": 44, "tags": ["admin"]}),
        json!({"name": "Bob", "age": 23}),
        json!({"name": "Carol", "age": 51, "active": true}),
        json!({"name": "Dave", "age": "unknown"}),
        json!({"name": "Eve"}),
    ] {
        db.create(&session, "person", person).await?;
    }
    Ok((db, session))
}

async fn names(db: &Db, session: &Session, expression: Value) -> areadb::Result<Vec<String>> {
    let mut names: Vec<String> = db
        .list(session, "person", &expression)
        .await?
        .iter()
        .filter_map(|r| r["name"].as_str().map(str::to_string))
        .collect();
    names.sort();
    Ok(names)
}

#[tokio::test]
async fn test_comparisons() -> areadb::Result<()> {
    let (db, session) = people().await?;

    assert_eq!(names(&db, &session, json!({"eq": {"age": 44}})).await?, ["Alice"]);
    assert_eq!(
        names(&db, &session, json!({"ne": {"age": 44}})).await?,
        ["Bob", "Carol", "Dave", "Eve"]
    );
    // "unknown" and the missing age are not ordered against numbers
    assert_eq!(
        names(&db, &session, json!({"gt": {"age": 0}})).await?,
        ["Alice", "Bob", "Carol"]
    );
    assert_eq!(
        names(&db, &session, json!({"le": {"age": 44}})).await?,
        ["Alice", "Bob"]
    );
    assert_eq!(
        names(&db, &session, json!({"eq": {"tags": ["admin"]}})).await?,
        ["Alice"]
    );
    Ok(())
}

#[tokio::test]
async fn test_combinators() -> areadb::Result<()> {
    let (db, session) = people().await?;

    assert_eq!(
        names(
            &db,
            &session,
            json!({"and": [{"gt": {"age": 40}}, {"lt": {"age": 50}}]})
        )
        .await?,
        ["Alice"]
    );
    assert_eq!(
        names(
            &db,
            &session,
            json!({"or": [{"eq": {"age": 44}}, {"re": {"age": ".*3$"}}]})
        )
        .await?,
        ["Alice", "Bob"]
    );
    assert_eq!(
        names(&db, &session, json!({"not": {"re": {"name": "^[A-C]"}}})).await?,
        ["Dave", "Eve"]
    );
    // siblings of or are additional constraints
    assert_eq!(
        names(
            &db,
            &session,
            json!({"or": [{"eq": {"age": 44}}, {"eq": {"age": 51}}], "eq": {"active": true}})
        )
        .await?,
        ["Carol"]
    );
    Ok(())
}

#[tokio::test]
async fn test_query_errors_abort_the_list() -> areadb::Result<()> {
    let (db, session) = people().await?;

    for expression in [
        json!({"or": [{"eq": {"age": 1}}, {"re": {"name": "(("}}]}),
        json!({"like": {"name": "A%"}}),
        json!({"and": {"eq": {"age": 1}}}),
    ] {
        let err = db.list(&session, "person", &expression).await.unwrap_err();
        assert_eq!(err.code(), "L005", "{expression}");
        assert_eq!(err.kind(), ErrorKind::Query);
    }
    Ok(())
}

#[test]
fn test_evaluate_documented_examples() {
    let alice = json!({"name": "Alice", "age": 44});
    assert_eq!(evaluate(&json!({"eq": {"age": 44}}), &alice), Ok(true));
    assert_eq!(evaluate(&json!({"ne": {"age": 44}}), &alice), Ok(false));
    assert_eq!(
        evaluate(&json!({"and": [{"gt": {"age": 40}}, {"lt": {"age": 50}}]}), &alice),
        Ok(true)
    );
    assert_eq!(
        evaluate(
            &json!({"or": [{"eq": {"age": 44}}, {"re": {"age": ".*3$"}}]}),
            &json!({"age": 23})
        ),
        Ok(true)
    );
    assert_eq!(evaluate(&json!({"not": {"eq": {"age": 44}}}), &alice), Ok(false));
    assert!(matches!(
        evaluate(&json!({"re": {"name": "["}}), &alice),
        Err(QueryError::InvalidRegex { .. })
    ));
}
