//! End-to-end trade workflow tests against a real database
//!
//! Run with a disposable Postgres instance:
//! `TEST_DATABASE_URL=postgres://localhost/tradeloop_test cargo test -- --ignored`

#[cfg(test)]
mod tests {
    use sqlx::PgPool;
    use uuid::Uuid;

    use tradeloop_server::error::ApiError;
    use tradeloop_server::items::{
        CreateItemRequest, Item, ItemCondition, ItemService, ItemStatus,
    };
    use tradeloop_server::models::PaginationParams;
    use tradeloop_server::notifications::{NotificationService, NotificationType};
    use tradeloop_server::trades::{ProposeTradeRequest, TradeService, TradeStatus};

    const EXPIRY_DAYS: i64 = 7;
    const MAX_IMAGES: usize = 3;

    /// Helper to create a test database pool with migrations applied
    async fn setup_test_db() -> PgPool {
        let database_url = std::env::var("TEST_DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/tradeloop_test".to_string());

        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect(&database_url)
            .await
            .expect("Failed to connect to test database");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        pool
    }

    /// Seed a user directly; auth flows have their own tests
    async fn seed_user(pool: &PgPool, name: &str) -> Uuid {
        sqlx::query_scalar(
            r#"
            INSERT INTO users (id, name, email, password_hash)
            VALUES ($1, $2, $3, 'seeded-hash')
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(format!("{}@example.test", Uuid::new_v4()))
        .fetch_one(pool)
        .await
        .expect("Failed to seed user")
    }

    /// Seed an item through the real listing path
    async fn seed_item(pool: &PgPool, owner_id: Uuid, name: &str) -> Item {
        ItemService::new(pool.clone(), MAX_IMAGES)
            .create_item(
                owner_id,
                CreateItemRequest {
                    name: name.to_string(),
                    description: "Seeded for workflow tests".to_string(),
                    condition: ItemCondition::Good,
                    category: "workflow-test".to_string(),
                    images: vec!["https://cdn.example/seed.jpg".to_string()],
                },
            )
            .await
            .expect("Failed to seed item")
    }

    async fn item_status(pool: &PgPool, item_id: Uuid) -> ItemStatus {
        sqlx::query_scalar("SELECT status FROM items WHERE id = $1")
            .bind(item_id)
            .fetch_one(pool)
            .await
            .expect("Failed to read item status")
    }

    async fn trade_status(pool: &PgPool, trade_id: Uuid) -> TradeStatus {
        sqlx::query_scalar("SELECT status FROM trades WHERE id = $1")
            .bind(trade_id)
            .fetch_one(pool)
            .await
            .expect("Failed to read trade status")
    }

    async fn user_stats(pool: &PgPool, user_id: Uuid) -> (i32, i32, i32) {
        sqlx::query_as("SELECT trades_count, listings_count, xp FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await
            .expect("Failed to read user stats")
    }

    async fn notifications_for(pool: &PgPool, user_id: Uuid) -> Vec<(NotificationType, String)> {
        sqlx::query_as(
            "SELECT notification_type, title FROM notifications WHERE user_id = $1 ORDER BY created_at",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
        .expect("Failed to read notifications")
    }

    fn pair(offered: &Item, requested: &Item) -> ProposeTradeRequest {
        ProposeTradeRequest {
            offered_item_id: offered.id,
            requested_item_id: requested.id,
        }
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_propose_marks_offered_item_pending_and_notifies_responder() {
        let pool = setup_test_db().await;
        let trades = TradeService::new(pool.clone(), EXPIRY_DAYS);

        let alice = seed_user(&pool, "Alice").await;
        let bob = seed_user(&pool, "Bob").await;
        let bike = seed_item(&pool, alice, "Mountain bike").await;
        let amp = seed_item(&pool, bob, "Guitar amp").await;

        let outcome = trades
            .propose_trade(alice, pair(&bike, &amp))
            .await
            .expect("Propose should succeed");

        assert!(!outcome.matched);
        assert_eq!(outcome.trade.status, TradeStatus::Pending);
        assert_eq!(outcome.trade.initiated_by, alice);
        assert_eq!(outcome.trade.responded_by, bob);
        assert!(outcome.trade.expires_at.is_some());

        // Only the offered item leaves circulation
        assert_eq!(item_status(&pool, bike.id).await, ItemStatus::Pending);
        assert_eq!(item_status(&pool, amp.id).await, ItemStatus::Available);

        let inbox = notifications_for(&pool, bob).await;
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].0, NotificationType::Trade);
        assert_eq!(inbox[0].1, "New trade proposal");
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_reciprocal_proposals_settle_as_match() {
        let pool = setup_test_db().await;
        let trades = TradeService::new(pool.clone(), EXPIRY_DAYS);

        let alice = seed_user(&pool, "Alice").await;
        let bob = seed_user(&pool, "Bob").await;
        let bike = seed_item(&pool, alice, "Mountain bike").await;
        let amp = seed_item(&pool, bob, "Guitar amp").await;

        let first = trades
            .propose_trade(alice, pair(&bike, &amp))
            .await
            .expect("First propose should succeed");
        assert!(!first.matched);

        let second = trades
            .propose_trade(bob, pair(&amp, &bike))
            .await
            .expect("Reciprocal propose should settle as a match");

        assert!(second.matched);
        assert_eq!(second.trade.status, TradeStatus::Accepted);
        assert_eq!(
            trade_status(&pool, first.trade.id).await,
            TradeStatus::Accepted
        );

        assert_eq!(item_status(&pool, bike.id).await, ItemStatus::Traded);
        assert_eq!(item_status(&pool, amp.id).await, ItemStatus::Traded);

        // Stats move exactly once per party: one listing, one trade
        let (alice_trades, alice_listings, alice_xp) = user_stats(&pool, alice).await;
        let (bob_trades, _, bob_xp) = user_stats(&pool, bob).await;
        assert_eq!(alice_trades, 1);
        assert_eq!(alice_listings, 1);
        assert_eq!(alice_xp, 35);
        assert_eq!(bob_trades, 1);
        assert_eq!(bob_xp, 35);

        // One match notification each, on top of Bob's proposal notice
        let alice_matches: Vec<_> = notifications_for(&pool, alice)
            .await
            .into_iter()
            .filter(|(kind, _)| *kind == NotificationType::Match)
            .collect();
        let bob_matches: Vec<_> = notifications_for(&pool, bob)
            .await
            .into_iter()
            .filter(|(kind, _)| *kind == NotificationType::Match)
            .collect();
        assert_eq!(alice_matches.len(), 1);
        assert_eq!(bob_matches.len(), 1);
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_accept_settles_items_stats_and_notification() {
        let pool = setup_test_db().await;
        let trades = TradeService::new(pool.clone(), EXPIRY_DAYS);

        let alice = seed_user(&pool, "Alice").await;
        let bob = seed_user(&pool, "Bob").await;
        let bike = seed_item(&pool, alice, "Mountain bike").await;
        let amp = seed_item(&pool, bob, "Guitar amp").await;

        let proposed = trades
            .propose_trade(alice, pair(&bike, &amp))
            .await
            .expect("Propose should succeed");

        let accepted = trades
            .accept_trade(proposed.trade.id, bob)
            .await
            .expect("Responder accept should succeed");

        assert_eq!(accepted.status, TradeStatus::Accepted);
        assert_eq!(item_status(&pool, bike.id).await, ItemStatus::Traded);
        assert_eq!(item_status(&pool, amp.id).await, ItemStatus::Traded);

        let (alice_trades, _, _) = user_stats(&pool, alice).await;
        let (bob_trades, _, _) = user_stats(&pool, bob).await;
        assert_eq!(alice_trades, 1);
        assert_eq!(bob_trades, 1);

        let alice_inbox = notifications_for(&pool, alice).await;
        assert!(alice_inbox
            .iter()
            .any(|(_, title)| title == "Trade accepted"));
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_reject_releases_offered_item() {
        let pool = setup_test_db().await;
        let trades = TradeService::new(pool.clone(), EXPIRY_DAYS);

        let alice = seed_user(&pool, "Alice").await;
        let bob = seed_user(&pool, "Bob").await;
        let bike = seed_item(&pool, alice, "Mountain bike").await;
        let amp = seed_item(&pool, bob, "Guitar amp").await;

        let proposed = trades
            .propose_trade(alice, pair(&bike, &amp))
            .await
            .expect("Propose should succeed");
        assert_eq!(item_status(&pool, bike.id).await, ItemStatus::Pending);

        let rejected = trades
            .reject_trade(proposed.trade.id, bob)
            .await
            .expect("Responder reject should succeed");

        assert_eq!(rejected.status, TradeStatus::Rejected);
        assert_eq!(item_status(&pool, bike.id).await, ItemStatus::Available);
        assert_eq!(item_status(&pool, amp.id).await, ItemStatus::Available);

        let alice_inbox = notifications_for(&pool, alice).await;
        assert!(alice_inbox
            .iter()
            .any(|(_, title)| title == "Trade declined"));

        // Back in circulation means proposable again
        let again = trades
            .propose_trade(alice, pair(&bike, &amp))
            .await
            .expect("Re-propose after reject should succeed");
        assert_ne!(again.trade.id, proposed.trade.id);
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_proposing_traded_item_creates_no_trade() {
        let pool = setup_test_db().await;
        let trades = TradeService::new(pool.clone(), EXPIRY_DAYS);

        let alice = seed_user(&pool, "Alice").await;
        let bob = seed_user(&pool, "Bob").await;
        let bike = seed_item(&pool, alice, "Mountain bike").await;
        let amp = seed_item(&pool, bob, "Guitar amp").await;

        sqlx::query("UPDATE items SET status = 'traded' WHERE id = $1")
            .bind(bike.id)
            .execute(&pool)
            .await
            .expect("Failed to mark item traded");

        let result = trades.propose_trade(alice, pair(&bike, &amp)).await;
        assert!(matches!(result, Err(ApiError::InvalidState(_))));

        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM trades WHERE offered_item_id = $1 OR requested_item_id = $1",
        )
        .bind(bike.id)
        .fetch_one(&pool)
        .await
        .expect("Failed to count trades");
        assert_eq!(count, 0);
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_duplicate_propose_is_idempotent() {
        let pool = setup_test_db().await;
        let trades = TradeService::new(pool.clone(), EXPIRY_DAYS);

        let alice = seed_user(&pool, "Alice").await;
        let bob = seed_user(&pool, "Bob").await;
        let bike = seed_item(&pool, alice, "Mountain bike").await;
        let amp = seed_item(&pool, bob, "Guitar amp").await;

        let first = trades
            .propose_trade(alice, pair(&bike, &amp))
            .await
            .expect("First propose should succeed");
        let second = trades
            .propose_trade(alice, pair(&bike, &amp))
            .await
            .expect("Duplicate propose should return the live proposal");

        assert_eq!(first.trade.id, second.trade.id);
        assert!(!second.matched);

        let pending: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM trades
            WHERE offered_item_id = $1 AND requested_item_id = $2 AND status = 'pending'
            "#,
        )
        .bind(bike.id)
        .bind(amp.id)
        .fetch_one(&pool)
        .await
        .expect("Failed to count pending trades");
        assert_eq!(pending, 1);

        // The responder was only told once
        assert_eq!(notifications_for(&pool, bob).await.len(), 1);
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_accept_by_non_responder_is_forbidden_with_no_writes() {
        let pool = setup_test_db().await;
        let trades = TradeService::new(pool.clone(), EXPIRY_DAYS);

        let alice = seed_user(&pool, "Alice").await;
        let bob = seed_user(&pool, "Bob").await;
        let carol = seed_user(&pool, "Carol").await;
        let bike = seed_item(&pool, alice, "Mountain bike").await;
        let amp = seed_item(&pool, bob, "Guitar amp").await;

        let proposed = trades
            .propose_trade(alice, pair(&bike, &amp))
            .await
            .expect("Propose should succeed");

        // Neither the initiator nor a stranger may accept
        let by_initiator = trades.accept_trade(proposed.trade.id, alice).await;
        assert!(matches!(by_initiator, Err(ApiError::Forbidden(_))));
        let by_stranger = trades.accept_trade(proposed.trade.id, carol).await;
        assert!(matches!(by_stranger, Err(ApiError::Forbidden(_))));

        assert_eq!(
            trade_status(&pool, proposed.trade.id).await,
            TradeStatus::Pending
        );
        assert_eq!(item_status(&pool, bike.id).await, ItemStatus::Pending);
        assert_eq!(item_status(&pool, amp.id).await, ItemStatus::Available);

        let (alice_trades, _, _) = user_stats(&pool, alice).await;
        assert_eq!(alice_trades, 0);
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_reject_by_initiator_is_forbidden() {
        let pool = setup_test_db().await;
        let trades = TradeService::new(pool.clone(), EXPIRY_DAYS);

        let alice = seed_user(&pool, "Alice").await;
        let bob = seed_user(&pool, "Bob").await;
        let bike = seed_item(&pool, alice, "Mountain bike").await;
        let amp = seed_item(&pool, bob, "Guitar amp").await;

        let proposed = trades
            .propose_trade(alice, pair(&bike, &amp))
            .await
            .expect("Propose should succeed");

        let result = trades.reject_trade(proposed.trade.id, alice).await;
        assert!(matches!(result, Err(ApiError::Forbidden(_))));
        assert_eq!(
            trade_status(&pool, proposed.trade.id).await,
            TradeStatus::Pending
        );
        assert_eq!(item_status(&pool, bike.id).await, ItemStatus::Pending);
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_match_displaces_other_proposals_on_the_pair() {
        let pool = setup_test_db().await;
        let trades = TradeService::new(pool.clone(), EXPIRY_DAYS);

        let alice = seed_user(&pool, "Alice").await;
        let bob = seed_user(&pool, "Bob").await;
        let carol = seed_user(&pool, "Carol").await;
        let bike = seed_item(&pool, alice, "Mountain bike").await;
        let amp = seed_item(&pool, bob, "Guitar amp").await;
        let skates = seed_item(&pool, carol, "Roller skates").await;

        // Carol wants the bike too
        let carols = trades
            .propose_trade(carol, pair(&skates, &bike))
            .await
            .expect("Carol's propose should succeed");

        // Alice and Bob match on bike <-> amp
        trades
            .propose_trade(alice, pair(&bike, &amp))
            .await
            .expect("Alice's propose should succeed");
        let matched = trades
            .propose_trade(bob, pair(&amp, &bike))
            .await
            .expect("Bob's propose should settle as a match");
        assert!(matched.matched);

        // Carol's proposal was displaced and her item released
        assert_eq!(
            trade_status(&pool, carols.trade.id).await,
            TradeStatus::Rejected
        );
        assert_eq!(item_status(&pool, skates.id).await, ItemStatus::Available);

        let carol_inbox = notifications_for(&pool, carol).await;
        assert!(carol_inbox
            .iter()
            .any(|(kind, title)| *kind == NotificationType::System
                && title == "Trade proposal closed"));
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_complete_trade_closes_both_sides_of_a_match() {
        let pool = setup_test_db().await;
        let trades = TradeService::new(pool.clone(), EXPIRY_DAYS);

        let alice = seed_user(&pool, "Alice").await;
        let bob = seed_user(&pool, "Bob").await;
        let bike = seed_item(&pool, alice, "Mountain bike").await;
        let amp = seed_item(&pool, bob, "Guitar amp").await;

        let first = trades
            .propose_trade(alice, pair(&bike, &amp))
            .await
            .expect("Propose should succeed");
        let second = trades
            .propose_trade(bob, pair(&amp, &bike))
            .await
            .expect("Reciprocal propose should match");

        let completed = trades
            .complete_trade(second.trade.id, alice)
            .await
            .expect("A party can complete an accepted trade");
        assert_eq!(completed.status, TradeStatus::Completed);

        // The reciprocal twin completes alongside
        assert_eq!(
            trade_status(&pool, first.trade.id).await,
            TradeStatus::Completed
        );

        let bob_inbox = notifications_for(&pool, bob).await;
        assert!(bob_inbox
            .iter()
            .any(|(_, title)| title == "Trade completed"));

        // Completing twice is an invalid state, not a silent no-op
        let again = trades.complete_trade(second.trade.id, bob).await;
        assert!(matches!(again, Err(ApiError::InvalidState(_))));
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_expiry_sweep_rejects_only_overdue_proposals() {
        let pool = setup_test_db().await;
        let trades = TradeService::new(pool.clone(), EXPIRY_DAYS);

        let alice = seed_user(&pool, "Alice").await;
        let bob = seed_user(&pool, "Bob").await;
        let bike = seed_item(&pool, alice, "Mountain bike").await;
        let amp = seed_item(&pool, bob, "Guitar amp").await;
        let lamp = seed_item(&pool, alice, "Desk lamp").await;
        let chair = seed_item(&pool, bob, "Office chair").await;

        let overdue = trades
            .propose_trade(alice, pair(&bike, &amp))
            .await
            .expect("Propose should succeed");
        let fresh = trades
            .propose_trade(alice, pair(&lamp, &chair))
            .await
            .expect("Propose should succeed");

        sqlx::query("UPDATE trades SET expires_at = NOW() - INTERVAL '1 hour' WHERE id = $1")
            .bind(overdue.trade.id)
            .execute(&pool)
            .await
            .expect("Failed to backdate expiry");

        let expired = trades
            .expire_overdue_proposals()
            .await
            .expect("Sweep should succeed");
        assert_eq!(expired, 1);

        assert_eq!(
            trade_status(&pool, overdue.trade.id).await,
            TradeStatus::Rejected
        );
        assert_eq!(item_status(&pool, bike.id).await, ItemStatus::Available);

        // The fresh proposal is untouched
        assert_eq!(
            trade_status(&pool, fresh.trade.id).await,
            TradeStatus::Pending
        );
        assert_eq!(item_status(&pool, lamp.id).await, ItemStatus::Pending);

        let alice_inbox = notifications_for(&pool, alice).await;
        assert!(alice_inbox
            .iter()
            .any(|(kind, title)| *kind == NotificationType::System
                && title == "Trade proposal expired"));
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_get_trade_is_party_only() {
        let pool = setup_test_db().await;
        let trades = TradeService::new(pool.clone(), EXPIRY_DAYS);

        let alice = seed_user(&pool, "Alice").await;
        let bob = seed_user(&pool, "Bob").await;
        let carol = seed_user(&pool, "Carol").await;
        let bike = seed_item(&pool, alice, "Mountain bike").await;
        let amp = seed_item(&pool, bob, "Guitar amp").await;

        let proposed = trades
            .propose_trade(alice, pair(&bike, &amp))
            .await
            .expect("Propose should succeed");

        assert!(trades.get_trade(proposed.trade.id, alice).await.is_ok());
        assert!(trades.get_trade(proposed.trade.id, bob).await.is_ok());

        let outsider = trades.get_trade(proposed.trade.id, carol).await;
        assert!(matches!(outsider, Err(ApiError::Forbidden(_))));
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_candidates_exclude_own_and_already_proposed_items() {
        let pool = setup_test_db().await;
        let items = ItemService::new(pool.clone(), MAX_IMAGES);
        let trades = TradeService::new(pool.clone(), EXPIRY_DAYS);

        let alice = seed_user(&pool, "Alice").await;
        let bob = seed_user(&pool, "Bob").await;
        let carol = seed_user(&pool, "Carol").await;
        let bike = seed_item(&pool, alice, "Mountain bike").await;
        let spare = seed_item(&pool, alice, "Spare helmet").await;
        let amp = seed_item(&pool, bob, "Guitar amp").await;
        let skates = seed_item(&pool, carol, "Roller skates").await;

        trades
            .propose_trade(alice, pair(&bike, &amp))
            .await
            .expect("Propose should succeed");

        let feed = items
            .get_candidates(bike.id, alice, PaginationParams::default())
            .await
            .expect("Candidate feed should load");

        let ids: Vec<Uuid> = feed.data.iter().map(|i| i.id).collect();
        assert!(ids.contains(&skates.id));
        assert!(!ids.contains(&amp.id), "already-proposed target must be excluded");
        assert!(!ids.contains(&spare.id), "own items must be excluded");
        assert!(!ids.contains(&bike.id));

        // Only the owner may browse an item's feed
        let not_owner = items
            .get_candidates(bike.id, bob, PaginationParams::default())
            .await;
        assert!(matches!(not_owner, Err(ApiError::Forbidden(_))));
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_mark_read_by_non_recipient_is_forbidden() {
        let pool = setup_test_db().await;
        let notifications = NotificationService::new(pool.clone());

        let alice = seed_user(&pool, "Alice").await;
        let bob = seed_user(&pool, "Bob").await;

        let notice = notifications
            .notify(
                bob,
                NotificationType::System,
                "Housekeeping",
                "Nothing to see here",
                None,
                None,
            )
            .await
            .expect("Notify should succeed");

        let result = notifications.mark_read(notice.id, alice).await;
        assert!(matches!(result, Err(ApiError::Forbidden(_))));

        let read: bool = sqlx::query_scalar("SELECT read FROM notifications WHERE id = $1")
            .bind(notice.id)
            .fetch_one(&pool)
            .await
            .expect("Failed to read notification");
        assert!(!read);

        // The recipient flips it, and the flip is idempotent
        let marked = notifications
            .mark_read(notice.id, bob)
            .await
            .expect("Recipient mark_read should succeed");
        assert!(marked.read);
        let again = notifications
            .mark_read(notice.id, bob)
            .await
            .expect("Second mark_read is a no-op");
        assert!(again.read);
    }
}
