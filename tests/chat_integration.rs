//! End-to-end chat scenarios over real TCP connections.

mod support;

use support::TestServer;

#[tokio::test]
async fn test_registration_then_chat() {
    let server = TestServer::start().await;
    let mut alice = server.connect().await;
    let mut bob = server.connect().await;

    alice.send("!register Alice pw1").await;
    assert_eq!(alice.recv().await, "Registration successful! Welcome Alice");

    bob.send("!register bob pw2").await;
    assert_eq!(bob.recv().await, "Registration successful! Welcome bob");

    alice.send("hello").await;
    assert_eq!(bob.recv_containing("[Alice]").await, "[Alice]: hello");
    // The sender sees their own line too.
    assert_eq!(alice.recv_containing("[Alice]").await, "[Alice]: hello");
}

#[tokio::test]
async fn test_duplicate_registration_stays_in_login() {
    let server = TestServer::start().await;
    let mut alice = server.connect().await;
    alice.register("Alice", "pw1").await;

    let mut imposter = server.connect().await;
    imposter.send("!register alice pw3").await;
    assert_eq!(imposter.recv().await, "[Server]: Username already exists.");

    // Still unauthenticated: chat is refused.
    imposter.send("hi there").await;
    assert_eq!(imposter.recv().await, "Please login or register first...");
}

#[tokio::test]
async fn test_login_returns_registered_casing() {
    let server = TestServer::start().await;
    let mut alice = server.connect().await;
    alice.register("Alice", "pw1").await;
    alice.send("!exit").await;
    alice.expect_close().await;

    let mut returning = server.connect().await;
    returning.send("!login alice pw1").await;
    assert_eq!(
        returning.recv().await,
        "Login successful! Welcome back Alice"
    );
}

#[tokio::test]
async fn test_login_failures() {
    let server = TestServer::start().await;
    let mut alice = server.connect().await;
    alice.register("Alice", "pw1").await;

    let mut other = server.connect().await;
    other.send("!login ghost pw").await;
    assert_eq!(other.recv().await, "[Server]: Unknown username.");
    other.send("!login Alice wrong").await;
    assert_eq!(other.recv().await, "[Server]: Incorrect password.");
    // Alice is connected, so a second session is refused outright.
    other.send("!login Alice pw1").await;
    assert_eq!(
        other.recv().await,
        "[Server]: That user is already logged in."
    );
}

#[tokio::test]
async fn test_username_format_rules() {
    let server = TestServer::start().await;
    let mut client = server.connect().await;

    client.send("!register ab pw").await;
    assert_eq!(
        client.recv().await,
        "[Server]: Username must be at least 3 characters."
    );
    client.send("!register this_name_is_too_long pw").await;
    assert_eq!(
        client.recv().await,
        "[Server]: Username must be at most 16 characters."
    );
    client.send("!register bad.name pw").await;
    assert_eq!(
        client.recv().await,
        "[Server]: Username may only contain letters, digits, and underscores."
    );
    client.send("!register Admin pw").await;
    assert_eq!(client.recv().await, "[Server]: That username is reserved.");
}

#[tokio::test]
async fn test_whisper_routing() {
    let server = TestServer::start().await;
    let mut alice = server.connect().await;
    let mut bob = server.connect().await;
    alice.register("Alice", "pw1").await;
    bob.register("bob", "pw2").await;

    alice.send("!whisper BOB psst").await;
    assert_eq!(
        bob.recv_containing("Whisper").await,
        "[Whisper from Alice]: psst"
    );
    assert_eq!(
        alice.recv_containing("whispered").await,
        "[You whispered to bob]: psst"
    );

    alice.send("!whisper \"bob\" quoted form").await;
    assert_eq!(
        bob.recv_containing("Whisper").await,
        "[Whisper from Alice]: quoted form"
    );
    alice.recv_containing("whispered").await;

    alice.send("!whisper \"bob never closed").await;
    assert_eq!(
        alice.recv().await,
        "[Server]: Missing closing quote in whisper target."
    );
    alice.send("!whisper bob").await;
    assert_eq!(
        alice.recv().await,
        "[Server]: Whisper message may not be empty."
    );
    alice.send("!whisper ghost hello").await;
    assert_eq!(
        alice.recv().await,
        "[Server]: No user named 'ghost' is connected."
    );
}

#[tokio::test]
async fn test_rename_updates_store_and_room() {
    let server = TestServer::start().await;
    let mut alice = server.connect().await;
    let mut bob = server.connect().await;
    alice.register("Alice", "pw1").await;
    bob.register("bob", "pw2").await;

    alice.send("!user Al1ce").await;
    assert_eq!(
        bob.recv_containing("known as").await,
        "[Alice] is now known as [Al1ce]"
    );
    assert_eq!(
        alice.recv_containing("known as").await,
        "[Alice] is now known as [Al1ce]"
    );

    // The persisted name changed with it.
    assert!(server.users.stats("Al1ce").await.unwrap().is_some());
    assert!(server.users.stats("Alice").await.unwrap().is_none());

    // The new name is taken, live and in the store.
    bob.send("!user al1ce").await;
    assert_eq!(bob.recv().await, "[Server]: Username already exists.");
}

#[tokio::test]
async fn test_roll_announces_to_room() {
    let server = TestServer::start().await;
    let mut alice = server.connect().await;
    let mut bob = server.connect().await;
    alice.register("Alice", "pw1").await;
    bob.register("bob", "pw2").await;

    // A one-sided die makes the result deterministic.
    alice.send("!roll 1").await;
    assert_eq!(
        bob.recv_containing("[Roll]").await,
        "[Roll] Alice rolled a 1 (1 – 1)"
    );
    assert_eq!(
        alice.recv_containing("[Roll]").await,
        "[Roll] Alice rolled a 1 (1 – 1)"
    );

    alice.send("!roll 0").await;
    assert_eq!(
        alice.recv_containing("Roll maximum").await,
        "[Server]: Roll maximum must be a whole number of at least 1."
    );
    alice.send("!roll six").await;
    alice.recv_containing("Roll maximum").await;
}

#[tokio::test]
async fn test_who_lists_connected_users() {
    let server = TestServer::start().await;
    let mut alice = server.connect().await;
    let mut bob = server.connect().await;
    alice.register("Alice", "pw1").await;
    bob.register("bob", "pw2").await;

    alice.send("!who").await;
    assert_eq!(
        alice.recv_containing("Connected users").await,
        "[Server]: Connected users (2): Alice, bob"
    );
}

#[tokio::test]
async fn test_scores_lists_users_in_rank_order() {
    let server = TestServer::start().await;
    let mut alice = server.connect().await;
    let mut bob = server.connect().await;
    alice.register("Alice", "pw1").await;
    bob.register("bob", "pw2").await;

    server.users.increment_wins("bob").await.unwrap();

    alice.send("!scores").await;
    assert_eq!(alice.recv_containing("[Scores]").await, "[Scores]");
    assert_eq!(alice.recv().await, "bob: 1W 0L 0D");
    assert_eq!(alice.recv().await, "Alice: 0W 0L 0D");
}

#[tokio::test]
async fn test_empty_line_is_ignored() {
    let server = TestServer::start().await;
    let mut client = server.connect().await;
    client.send("").await;
    assert_eq!(client.recv().await, "Empty command ignored.");
}

#[tokio::test]
async fn test_exit_announces_departure() {
    let server = TestServer::start().await;
    let mut alice = server.connect().await;
    let mut bob = server.connect().await;
    alice.register("Alice", "pw1").await;
    bob.register("bob", "pw2").await;

    alice.send("!exit").await;
    alice.expect_close().await;
    assert_eq!(
        bob.recv_containing("left the chat").await,
        "[Server]: Alice left the chat."
    );
}

#[tokio::test]
async fn test_transport_drop_announces_departure() {
    let server = TestServer::start().await;
    let mut alice = server.connect().await;
    let mut bob = server.connect().await;
    alice.register("Alice", "pw1").await;
    bob.register("bob", "pw2").await;

    alice.abandon();
    assert_eq!(
        bob.recv_containing("left the chat").await,
        "[Server]: Alice left the chat."
    );
}

#[tokio::test]
async fn test_non_moderator_cannot_kick() {
    let server = TestServer::start().await;
    let mut alice = server.connect().await;
    let mut bob = server.connect().await;
    alice.register("Alice", "pw1").await;
    bob.register("bob", "pw2").await;

    alice.send("!kick bob").await;
    assert_eq!(
        alice.recv_containing("not a moderator").await,
        "[Server]: You are not a moderator."
    );
}

#[tokio::test]
async fn test_unknown_command_is_broadcast_as_chat() {
    let server = TestServer::start().await;
    let mut alice = server.connect().await;
    let mut bob = server.connect().await;
    alice.register("Alice", "pw1").await;
    bob.register("bob", "pw2").await;

    alice.send("!dance").await;
    assert_eq!(bob.recv_containing("[Alice]").await, "[Alice]: !dance");
}
