// ============================================================================
// ROUTES TESTS — Signed requests against the HTTP handlers
// ============================================================================


use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;

use rps_escrow::auth::{self, derive_address, generate_keypair, sign_message};
use rps_escrow::routes::{
    balance_handler, enroll_handler, play_handler, refund_handler, stats_handler,
    winnings_handler, withdraw_handler, ApiError, AppState, EnrollRequest, PlayRequest,
    RefundRequest, WithdrawRequest,
};
use rps_escrow::{
    EscrowLedger, InMemoryTreasury, LedgerError, MemorySink, Move, DEFAULT_MINIMUM_BET,
};
use test_helpers::UNIT;

// ============================================================================
// SETUP
// ============================================================================

struct Keypair {
    public: String,
    secret: String,
    address: String,
}

fn keypair() -> Keypair {
    let (public, secret) = generate_keypair();
    let address = derive_address(&public).unwrap();
    Keypair {
        public,
        secret,
        address,
    }
}

struct TestService {
    state: AppState,
    arbiter: Keypair,
}

fn test_service() -> TestService {
    let arbiter = keypair();
    let ledger = EscrowLedger::new(
        arbiter.address.clone(),
        DEFAULT_MINIMUM_BET,
        Arc::new(InMemoryTreasury::new()),
        Arc::new(MemorySink::new()),
    )
    .into_shared();

    TestService {
        state: AppState { ledger },
        arbiter,
    }
}

fn signed_enroll(player: &Keypair, amount: u128) -> EnrollRequest {
    let message = auth::enroll_message(&player.address, amount);
    EnrollRequest {
        player: player.address.clone(),
        amount,
        public_key: player.public.clone(),
        signature: sign_message(&player.secret, &message).unwrap(),
    }
}

fn signed_play(
    signer: &Keypair,
    player_a: &str,
    move_a: Move,
    player_b: &str,
    move_b: Move,
) -> PlayRequest {
    let message = auth::play_message(player_a, move_a, player_b, move_b);
    PlayRequest {
        player_a: player_a.to_string(),
        move_a,
        player_b: player_b.to_string(),
        move_b,
        public_key: signer.public.clone(),
        signature: sign_message(&signer.secret, &message).unwrap(),
    }
}

// ============================================================================
// ENROLL
// ============================================================================

#[tokio::test]
async fn test_enroll_round_trip() {
    let service = test_service();
    let alice = keypair();

    let response = enroll_handler(
        State(service.state.clone()),
        Json(signed_enroll(&alice, UNIT)),
    )
    .await
    .unwrap()
    .0;

    assert!(response.success);
    assert_eq!(response.player, alice.address);
    assert_eq!(response.balance, UNIT);

    let lookup = balance_handler(
        State(service.state.clone()),
        Path(alice.address.clone()),
    )
    .await
    .0;
    assert_eq!(lookup.balance, UNIT);
}

#[tokio::test]
async fn test_enroll_with_forged_signature_rejected() {
    let service = test_service();
    let alice = keypair();
    let mallory = keypair();

    // Mallory signs a deposit claiming to be alice.
    let message = auth::enroll_message(&alice.address, UNIT);
    let request = EnrollRequest {
        player: alice.address.clone(),
        amount: UNIT,
        public_key: mallory.public.clone(),
        signature: sign_message(&mallory.secret, &message).unwrap(),
    };

    let err = enroll_handler(State(service.state.clone()), Json(request))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Auth(_)));

    // The ledger was never touched.
    let lookup = balance_handler(State(service.state), Path(alice.address)).await.0;
    assert_eq!(lookup.balance, 0);
}

#[tokio::test]
async fn test_enroll_below_minimum_maps_to_ledger_error() {
    let service = test_service();
    let alice = keypair();

    let err = enroll_handler(
        State(service.state.clone()),
        Json(signed_enroll(&alice, 10)),
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        ApiError::Ledger(LedgerError::InsufficientDeposit { .. })
    ));
}

// ============================================================================
// PLAY
// ============================================================================

#[tokio::test]
async fn test_arbiter_resolves_match_over_http() {
    let service = test_service();
    let alice = keypair();
    let bob = keypair();

    enroll_handler(
        State(service.state.clone()),
        Json(signed_enroll(&alice, UNIT)),
    )
    .await
    .unwrap();
    enroll_handler(
        State(service.state.clone()),
        Json(signed_enroll(&bob, UNIT)),
    )
    .await
    .unwrap();

    let response = play_handler(
        State(service.state.clone()),
        Json(signed_play(
            &service.arbiter,
            &alice.address,
            Move::Paper,
            &bob.address,
            Move::Rock,
        )),
    )
    .await
    .unwrap()
    .0;

    assert!(response.success);
    assert_eq!(response.winner.as_deref(), Some(alice.address.as_str()));
    assert_eq!(response.rewarded, 2 * UNIT);

    let winnings = winnings_handler(
        State(service.state.clone()),
        Path(alice.address.clone()),
    )
    .await
    .0;
    assert_eq!(winnings.winnings, 2 * UNIT);
}

#[tokio::test]
async fn test_play_signed_by_non_arbiter_is_forbidden() {
    let service = test_service();
    let alice = keypair();
    let bob = keypair();

    enroll_handler(
        State(service.state.clone()),
        Json(signed_enroll(&alice, UNIT)),
    )
    .await
    .unwrap();
    enroll_handler(
        State(service.state.clone()),
        Json(signed_enroll(&bob, UNIT)),
    )
    .await
    .unwrap();

    // Alice signs a play call herself; the signature is valid but her
    // derived address is not the arbiter.
    let err = play_handler(
        State(service.state.clone()),
        Json(signed_play(
            &alice,
            &alice.address,
            Move::Paper,
            &bob.address,
            Move::Rock,
        )),
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        ApiError::Ledger(LedgerError::Unauthorized { .. })
    ));

    // Stakes are still intact.
    let lookup = balance_handler(State(service.state), Path(alice.address)).await.0;
    assert_eq!(lookup.balance, UNIT);
}

#[tokio::test]
async fn test_play_with_tampered_moves_rejected() {
    let service = test_service();
    let alice = keypair();
    let bob = keypair();

    enroll_handler(
        State(service.state.clone()),
        Json(signed_enroll(&alice, UNIT)),
    )
    .await
    .unwrap();
    enroll_handler(
        State(service.state.clone()),
        Json(signed_enroll(&bob, UNIT)),
    )
    .await
    .unwrap();

    // Signature covers PAPER/ROCK but the request carries ROCK/PAPER.
    let mut request = signed_play(
        &service.arbiter,
        &alice.address,
        Move::Paper,
        &bob.address,
        Move::Rock,
    );
    request.move_a = Move::Rock;
    request.move_b = Move::Paper;

    let err = play_handler(State(service.state), Json(request))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Auth(_)));
}

// ============================================================================
// REFUND & WITHDRAW
// ============================================================================

#[tokio::test]
async fn test_refund_round_trip() {
    let service = test_service();
    let alice = keypair();

    enroll_handler(
        State(service.state.clone()),
        Json(signed_enroll(&alice, UNIT)),
    )
    .await
    .unwrap();

    let message = auth::refund_message(&alice.address);
    let request = RefundRequest {
        player: alice.address.clone(),
        public_key: alice.public.clone(),
        signature: sign_message(&alice.secret, &message).unwrap(),
    };

    let response = refund_handler(State(service.state.clone()), Json(request.clone()))
        .await
        .unwrap()
        .0;
    assert_eq!(response.refunded, UNIT);

    // Immediate replay finds nothing left.
    let err = refund_handler(State(service.state), Json(request))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ApiError::Ledger(LedgerError::NothingToRefund { .. })
    ));
}

#[tokio::test]
async fn test_withdraw_round_trip() {
    let service = test_service();
    let alice = keypair();
    let bob = keypair();

    enroll_handler(
        State(service.state.clone()),
        Json(signed_enroll(&alice, UNIT)),
    )
    .await
    .unwrap();
    enroll_handler(
        State(service.state.clone()),
        Json(signed_enroll(&bob, UNIT)),
    )
    .await
    .unwrap();
    play_handler(
        State(service.state.clone()),
        Json(signed_play(
            &service.arbiter,
            &alice.address,
            Move::Scissors,
            &bob.address,
            Move::Paper,
        )),
    )
    .await
    .unwrap();

    let message = auth::withdraw_message(&alice.address);
    let request = WithdrawRequest {
        player: alice.address.clone(),
        public_key: alice.public.clone(),
        signature: sign_message(&alice.secret, &message).unwrap(),
    };

    let response = withdraw_handler(State(service.state.clone()), Json(request.clone()))
        .await
        .unwrap()
        .0;
    assert_eq!(response.withdrawn, 2 * UNIT);

    let err = withdraw_handler(State(service.state), Json(request))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ApiError::Ledger(LedgerError::NothingToWithdraw { .. })
    ));
}

// ============================================================================
// QUERY SURFACE
// ============================================================================

#[tokio::test]
async fn test_stats_reflect_activity() {
    let service = test_service();
    let alice = keypair();
    let bob = keypair();

    enroll_handler(
        State(service.state.clone()),
        Json(signed_enroll(&alice, UNIT)),
    )
    .await
    .unwrap();
    enroll_handler(
        State(service.state.clone()),
        Json(signed_enroll(&bob, 2 * UNIT)),
    )
    .await
    .unwrap();

    let stats = stats_handler(State(service.state)).await.0;
    assert_eq!(stats.total_enrolled, 3 * UNIT);
    assert_eq!(stats.open_balances, 3 * UNIT);
    assert_eq!(stats.enrolled_players, 2);
    assert_eq!(stats.unclaimed_winnings, 0);
}
