/// End-to-end command flow: claim a plot, manage its roster, and watch the
/// enforcer react to the same index the commands mutate.
use chrono::Utc;
use plotward::plot::{
    AccessEnforcer, CommandProcessor, JoinOutcome, MoveOutcome, PlotError, PlotId, Position,
};
use tempfile::TempDir;

mod common;
use common::{empty_index, test_config, FakePlayer};

#[test]
fn claim_manage_deny_enforce() {
    let dir = TempDir::new().expect("tempdir");
    let store = plotward::plot::PlotStoreBuilder::new(dir.path())
        .open()
        .expect("store");
    let config = test_config();
    let mut index = empty_index();

    let mut alice = FakePlayer::new("Alice").with_use_commands();
    let mut bob = FakePlayer::new("Bob").with_use_commands();

    // 1. Alice claims the plot she stands on.
    let reply = CommandProcessor::new(&mut index, &store, &config)
        .run(&mut alice, "claim")
        .expect("claim");
    assert!(reply.contains("0;0"), "unexpected reply: {}", reply);

    let plot = index.plot("plotworld", PlotId::new(0, 0)).expect("indexed");
    assert!(plot.is_persisted());
    assert_eq!(plot.owner(), Some("Alice"));
    // The configured 30-day expiry was armed at claim time.
    assert!(plot.expired_date().is_some());
    assert!(!plot.is_expired(Utc::now().date_naive()));

    // 2. Claiming again fails politely; the same cell claimed by Bob too.
    let reply = CommandProcessor::new(&mut index, &store, &config)
        .run(&mut bob, "claim")
        .expect("reclaim attempt");
    assert!(reply.contains("already claimed"));

    // 3. Alice invites Bob, then denies Mallory.
    CommandProcessor::new(&mut index, &store, &config)
        .run(&mut alice, "add Bob")
        .expect("add");
    CommandProcessor::new(&mut index, &store, &config)
        .run(&mut alice, "deny Mallory")
        .expect("deny");

    let plot = index.plot("plotworld", PlotId::new(0, 0)).expect("indexed");
    assert!(plot.is_member("Bob"));
    assert!(plot.is_denied("Mallory"));

    // 4. Bob cannot manage Alice's plot.
    let err = CommandProcessor::new(&mut index, &store, &config)
        .run(&mut bob, "deny Alice")
        .expect_err("not the owner");
    assert!(matches!(err, PlotError::PermissionDenied(_)));

    // 5. The enforcer holds Mallory at the border based on the same index.
    let enforcer = AccessEnforcer::new(&index);
    let mallory = FakePlayer::new("Mallory");
    let from = Position::new(30.0, 64.0, 5.0).facing(90.0, 0.0);
    let to = Position::new(6.0, 64.0, 5.0).facing(45.0, 0.0);
    assert!(matches!(
        enforcer.handle_move(&mallory, &from, &to),
        MoveOutcome::Rewrite(_)
    ));

    // Bob walks in freely.
    assert_eq!(enforcer.handle_move(&bob, &from, &to), MoveOutcome::Allow);

    // 6. An invitation lifts a standing denial.
    CommandProcessor::new(&mut index, &store, &config)
        .run(&mut alice, "add Mallory")
        .expect("add lifts denial");
    let plot = index.plot("plotworld", PlotId::new(0, 0)).expect("indexed");
    assert!(!plot.is_denied("Mallory"));

    // 7. Mutations reached the store as well as the index.
    let stored = store.get_plot("plotworld", PlotId::new(0, 0)).expect("stored");
    assert!(stored.is_member("Mallory"));
}

#[test]
fn deny_wildcard_then_join_relocates() {
    let dir = TempDir::new().expect("tempdir");
    let store = plotward::plot::PlotStoreBuilder::new(dir.path())
        .open()
        .expect("store");
    let config = test_config();
    let mut index = empty_index();

    let mut alice = FakePlayer::new("Alice").with_use_commands();
    CommandProcessor::new(&mut index, &store, &config)
        .run(&mut alice, "claim")
        .expect("claim");
    CommandProcessor::new(&mut index, &store, &config)
        .run(&mut alice, "deny *")
        .expect("deny everyone");

    // Owners are not exempt from the wildcard by name, but denying the
    // owner specifically is rejected.
    let reply = CommandProcessor::new(&mut index, &store, &config)
        .run(&mut alice, "deny Alice")
        .expect("deny owner");
    assert!(reply.contains("cannot deny"));

    let enforcer = AccessEnforcer::new(&index);
    let visitor = FakePlayer::new("Visitor").at(Position::new(5.0, 64.0, 5.0));
    match enforcer.handle_join(&visitor) {
        JoinOutcome::Relocate(home) => assert_eq!((home.x, home.y, home.z), (8.0, 65.0, 8.0)),
        JoinOutcome::Allow => panic!("wildcard denial should relocate joins"),
    }
}

#[test]
fn lifecycle_commands_update_the_record() {
    let dir = TempDir::new().expect("tempdir");
    let store = plotward::plot::PlotStoreBuilder::new(dir.path())
        .open()
        .expect("store");
    let config = test_config();
    let mut index = empty_index();

    let mut alice = FakePlayer::new("Alice").with_use_commands();
    CommandProcessor::new(&mut index, &store, &config)
        .run(&mut alice, "claim")
        .expect("claim");

    // Sell, name, finish, like; then read it all back through info.
    CommandProcessor::new(&mut index, &store, &config)
        .run(&mut alice, "sell 250")
        .expect("sell");
    CommandProcessor::new(&mut index, &store, &config)
        .run(&mut alice, "name Harbor View")
        .expect("name");
    CommandProcessor::new(&mut index, &store, &config)
        .run(&mut alice, "finish")
        .expect("finish");
    let reply = CommandProcessor::new(&mut index, &store, &config)
        .run(&mut alice, "like")
        .expect("like");
    assert!(reply.contains("1 likes"), "unexpected reply: {}", reply);

    // A second like from the same player is refused by the guard.
    let reply = CommandProcessor::new(&mut index, &store, &config)
        .run(&mut alice, "like")
        .expect("second like");
    assert!(reply.contains("already liked"));

    let plot = index.plot("plotworld", PlotId::new(0, 0)).expect("indexed");
    assert!(plot.is_for_sale());
    assert_eq!(plot.sale_price(), 250.0);
    assert_eq!(plot.name(), Some("Harbor View"));
    assert!(plot.is_finished());
    assert_eq!(plot.likes(), 1);

    let info = CommandProcessor::new(&mut index, &store, &config)
        .run(&mut alice, "info")
        .expect("info");
    assert!(info.contains("Harbor View"));
    assert!(info.contains("For sale at 250.00"));

    // Ending the sale zeroes the effective price.
    CommandProcessor::new(&mut index, &store, &config)
        .run(&mut alice, "sell stop")
        .expect("sell stop");
    let plot = index.plot("plotworld", PlotId::new(0, 0)).expect("indexed");
    assert!(!plot.is_for_sale());
    assert_eq!(plot.sale_price(), 0.0);

    // `home` teleports through the player abstraction.
    CommandProcessor::new(&mut index, &store, &config)
        .run(&mut alice, "home")
        .expect("home");
    let at = alice.location;
    assert_eq!((at.x, at.y, at.z), (8.0, 65.0, 8.0));
}

#[test]
fn capability_and_world_gates_come_first() {
    let dir = TempDir::new().expect("tempdir");
    let store = plotward::plot::PlotStoreBuilder::new(dir.path())
        .open()
        .expect("store");
    let config = test_config();
    let mut index = empty_index();

    // No `use.claim` capability.
    let mut nobody = FakePlayer::new("Nobody");
    let err = CommandProcessor::new(&mut index, &store, &config)
        .run(&mut nobody, "claim")
        .expect_err("capability gate");
    assert!(matches!(err, PlotError::PermissionDenied(_)));

    // Right capability, wrong world.
    let mut wanderer = FakePlayer::new("Wanderer").with_use_commands();
    wanderer.world = "wilderness".to_string();
    let err = CommandProcessor::new(&mut index, &store, &config)
        .run(&mut wanderer, "claim")
        .expect_err("world gate");
    assert!(matches!(err, PlotError::NotPlotWorld(_)));

    // Admin node passes both the capability gate and the owner check.
    let mut alice = FakePlayer::new("Alice").with_use_commands();
    CommandProcessor::new(&mut index, &store, &config)
        .run(&mut alice, "claim")
        .expect("claim");

    let mut admin = FakePlayer::new("Root").with_capability("plotward.admin.deny");
    let reply = CommandProcessor::new(&mut index, &store, &config)
        .run(&mut admin, "deny Griefer")
        .expect("admin deny on someone else's plot");
    assert!(reply.contains("now denied"));

    // Dispose with admin node removes store record and index entry.
    let mut admin = admin.with_capability("plotward.admin.dispose");
    CommandProcessor::new(&mut index, &store, &config)
        .run(&mut admin, "dispose")
        .expect("admin dispose");
    assert!(index.plot("plotworld", PlotId::new(0, 0)).is_none());
    assert!(matches!(
        store.get_plot("plotworld", PlotId::new(0, 0)),
        Err(PlotError::NotFound(_))
    ));
}
