use sqlx::PgPool;

/// Full bootstrap test: connect, migrate, verify the schema surface.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_full_bootstrap(pool: PgPool) {
    // Health check
    packshare_db::health_check(&pool).await.unwrap();

    // Every table of the collaboration schema exists and is queryable.
    let tables = [
        "\"user\"",
        "user_group",
        "user_group_membership",
        "package",
        "\"lock\"",
        "group_lock",
        "collaboration",
        "group_collaboration",
        "invitation",
        "collaboration_status",
    ];

    for table in tables {
        let count: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&pool)
            .await
            .unwrap_or_else(|e| panic!("{table} query failed: {e}"));
        assert_eq!(count.0, 0, "{table} should start empty");
    }
}

/// The unique-violation classifier recognizes SQLSTATE 23505 and nothing
/// else.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_unique_violation_classifier(pool: PgPool) {
    sqlx::query("INSERT INTO user_group (user_group_name) VALUES ('Curators')")
        .execute(&pool)
        .await
        .unwrap();

    let dup = sqlx::query("INSERT INTO user_group (user_group_name) VALUES ('Curators')")
        .execute(&pool)
        .await
        .unwrap_err();
    assert!(packshare_db::is_unique_violation(&dup));

    let syntax = sqlx::query("SELECT not_a_column FROM user_group")
        .execute(&pool)
        .await
        .unwrap_err();
    assert!(!packshare_db::is_unique_violation(&syntax));
}
