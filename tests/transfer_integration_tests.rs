#[macro_use]
mod common;

use actix_web::http::StatusCode;
use actix_web::test;
use ledger_bank_api::data::sql::SqlAccountRepository;
use ledger_bank_api::domain::models::TransferRequest;
use ledger_bank_api::domain::repository::AccountRepository;

async fn set_balance<R: AccountRepository>(repo: &R, id: i64, balance: i64) {
    let mut account = repo.find_by_id(id).await.unwrap().unwrap();
    account.balance = balance;
    repo.update(&account).await.unwrap();
}

async fn balance<R: AccountRepository>(repo: &R, id: i64) -> i64 {
    repo.find_by_id(id).await.unwrap().unwrap().balance
}

#[actix_web::test]
async fn test_transfer_moves_funds_and_echoes_request() {
    let (app, repo) = setup_app!();
    let alice = signup!(app, "alice@example.com");
    let bob = signup!(app, "bob@example.com");
    set_balance(repo.as_ref(), alice.id, 1000).await;
    set_balance(repo.as_ref(), bob.id, 250).await;
    let token = login!(app, "alice@example.com");

    let req = test::TestRequest::post()
        .uri("/transfer")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .set_json(serde_json::json!({
            "fromAccount": alice.id,
            "toAccount": bob.id,
            "amount": 400,
        }))
        .to_request();
    let echoed: TransferRequest = test::call_and_read_body_json(&app, req).await;
    assert_eq!(
        echoed,
        TransferRequest {
            from_account: alice.id,
            to_account: bob.id,
            amount: 400
        }
    );

    assert_eq!(balance(repo.as_ref(), alice.id).await, 600);
    assert_eq!(balance(repo.as_ref(), bob.id).await, 650);
}

#[actix_web::test]
async fn test_transfer_with_insufficient_funds_changes_nothing() {
    let (app, repo) = setup_app!();
    let alice = signup!(app, "alice@example.com");
    let bob = signup!(app, "bob@example.com");
    set_balance(repo.as_ref(), alice.id, 100).await;
    let token = login!(app, "alice@example.com");

    let req = test::TestRequest::post()
        .uri("/transfer")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .set_json(serde_json::json!({
            "fromAccount": alice.id,
            "toAccount": bob.id,
            "amount": 101,
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "insufficient funds");

    assert_eq!(balance(repo.as_ref(), alice.id).await, 100);
    assert_eq!(balance(repo.as_ref(), bob.id).await, 0);
}

#[actix_web::test]
async fn test_transfer_to_missing_account() {
    let (app, repo) = setup_app!();
    let alice = signup!(app, "alice@example.com");
    set_balance(repo.as_ref(), alice.id, 100).await;
    let token = login!(app, "alice@example.com");

    let req = test::TestRequest::post()
        .uri("/transfer")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .set_json(serde_json::json!({
            "fromAccount": alice.id,
            "toAccount": 4242,
            "amount": 10,
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(balance(repo.as_ref(), alice.id).await, 100);
}

#[actix_web::test]
async fn test_transfer_from_foreign_account_is_unauthorized() {
    let (app, repo) = setup_app!();
    let alice = signup!(app, "alice@example.com");
    let mallory = signup!(app, "mallory@example.com");
    set_balance(repo.as_ref(), alice.id, 500).await;
    let token = login!(app, "mallory@example.com");

    let req = test::TestRequest::post()
        .uri("/transfer")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .set_json(serde_json::json!({
            "fromAccount": alice.id,
            "toAccount": mallory.id,
            "amount": 500,
        }))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(balance(repo.as_ref(), alice.id).await, 500);
    assert_eq!(balance(repo.as_ref(), mallory.id).await, 0);
}

#[actix_web::test]
async fn test_transfer_rejects_invalid_bodies() {
    let (app, repo) = setup_app!();
    let alice = signup!(app, "alice@example.com");
    let bob = signup!(app, "bob@example.com");
    set_balance(repo.as_ref(), alice.id, 100).await;
    let token = login!(app, "alice@example.com");

    for body in [
        serde_json::json!({"fromAccount": alice.id, "toAccount": bob.id, "amount": 0}),
        serde_json::json!({"fromAccount": alice.id, "toAccount": bob.id, "amount": -20}),
        serde_json::json!({"fromAccount": alice.id, "toAccount": alice.id, "amount": 20}),
        serde_json::json!({"fromAccount": alice.id, "toAccount": bob.id, "amount": "20"}),
        serde_json::json!({"fromAccount": alice.id, "toAccount": bob.id}),
    ] {
        let req = test::TestRequest::post()
            .uri("/transfer")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .set_json(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert!(body["error"].is_string());
    }

    assert_eq!(balance(repo.as_ref(), alice.id).await, 100);
    assert_eq!(balance(repo.as_ref(), bob.id).await, 0);
}

#[actix_web::test]
async fn test_repeated_transfers_conserve_total_on_sql_store() {
    let (app, repo) = setup_app!(SqlAccountRepository, common::sqlite_repository().await);
    let alice = signup!(app, "alice@example.com");
    let bob = signup!(app, "bob@example.com");
    set_balance(repo.as_ref(), alice.id, 700).await;
    set_balance(repo.as_ref(), bob.id, 300).await;
    let alice_token = login!(app, "alice@example.com");
    let bob_token = login!(app, "bob@example.com");

    let moves = [
        (alice.id, bob.id, 150, &alice_token),
        (bob.id, alice.id, 400, &bob_token),
        (alice.id, bob.id, 950, &alice_token),
    ];
    for (from, to, amount, token) in moves {
        let req = test::TestRequest::post()
            .uri("/transfer")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .set_json(serde_json::json!({"fromAccount": from, "toAccount": to, "amount": amount}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    }

    let a = balance(repo.as_ref(), alice.id).await;
    let b = balance(repo.as_ref(), bob.id).await;
    assert_eq!((a, b), (0, 1000));
    assert_eq!(a + b, 1000);
}
