use std::sync::Arc;

use duel::{
    AnswerOption, CancelReason, Difficulty, DuelConfig, DuelError, DuelEvent, DuelService,
    DuelStatus, MemoryBank, MemoryRepository, NotificationHub, Question, Topic,
};

const CHALLENGER: u64 = 10;
const OPPONENT: u64 = 20;

// Every question has "a" (index 0) correct and "b" (index 1) wrong, so tests
// can steer outcomes deterministically.
fn bank(size: usize) -> MemoryBank {
    let questions = (1..=size as u64)
        .map(|id| Question {
            id,
            subject: "math".to_string(),
            difficulty: Difficulty::Medium,
            statement: format!("question {}", id),
            options: vec![
                AnswerOption {
                    key: "a".to_string(),
                    text: "right".to_string(),
                },
                AnswerOption {
                    key: "b".to_string(),
                    text: "wrong".to_string(),
                },
            ],
            correct_option: "a".to_string(),
            resolution: None,
        })
        .collect();
    MemoryBank::new(questions)
}

fn service(bank_size: usize, regular_rounds: u32) -> Arc<DuelService> {
    Arc::new(DuelService::new(
        Arc::new(MemoryRepository::new()),
        Arc::new(bank(bank_size)),
        Arc::new(NotificationHub::new(32)),
        DuelConfig {
            regular_rounds,
            points_per_correct: 1,
        },
    ))
}

async fn play_round(
    service: &DuelService,
    duel_id: u64,
    round: u32,
    challenger_answer: usize,
    opponent_answer: usize,
) {
    service
        .submit_answer(duel_id, CHALLENGER, round, challenger_answer)
        .await
        .unwrap();
    service
        .submit_answer(duel_id, OPPONENT, round, opponent_answer)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_full_duel_lifecycle() {
    let service = service(16, 2);
    let duel = service
        .create_challenge(CHALLENGER, OPPONENT, "math".to_string(), Difficulty::Medium)
        .unwrap();
    assert_eq!(duel.status, DuelStatus::Pending);
    assert!(duel.questions.is_empty());

    let pending = service.pending_for(OPPONENT).unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, duel.id);

    let accepted = service.accept(duel.id, OPPONENT).await.unwrap();
    assert_eq!(accepted.status, DuelStatus::InProgress);
    assert_eq!(accepted.questions.len(), 1);
    assert_eq!(accepted.current_round, 0);

    let mut events = service.hub().subscribe(Topic::Duel(duel.id));

    // Round 1: challenger correct, opponent wrong.
    let (own, _) = service
        .submit_answer(duel.id, CHALLENGER, 1, 0)
        .await
        .unwrap();
    assert!(!own.is_resolved());

    let (resolved, _) = service.submit_answer(duel.id, OPPONENT, 1, 1).await.unwrap();
    assert!(resolved.is_resolved());

    let (after_round_one, _) = service.get(duel.id, CHALLENGER).unwrap();
    assert_eq!(after_round_one.challenger_score, 1);
    assert_eq!(after_round_one.opponent_score, 0);
    assert_eq!(after_round_one.current_round, 1);
    // Round 2 starts automatically.
    assert_eq!(after_round_one.questions.len(), 2);

    let note = events.recv().await.unwrap();
    assert_eq!(note.duel_id, duel.id);
    match note.event {
        DuelEvent::RoundResolved {
            round_number,
            challenger_score,
            opponent_score,
            next_round,
            ..
        } => {
            assert_eq!(round_number, 1);
            assert_eq!(challenger_score, 1);
            assert_eq!(opponent_score, 0);
            assert_eq!(next_round, Some(2));
        }
        other => panic!("unexpected event {:?}", other),
    }

    // Round 2: challenger correct again, duel completes.
    play_round(&service, duel.id, 2, 0, 1).await;

    let (finished, _) = service.get(duel.id, OPPONENT).unwrap();
    assert_eq!(finished.status, DuelStatus::Completed);
    assert_eq!(finished.winner, Some(CHALLENGER));
    assert_eq!(finished.challenger_score, 2);
    assert!(!finished.sudden_death);
    assert_eq!(finished.questions.len(), 2);

    // round_resolved for round 2, then duel_completed.
    let note = events.recv().await.unwrap();
    assert!(matches!(note.event, DuelEvent::RoundResolved { next_round: None, .. }));
    let note = events.recv().await.unwrap();
    assert!(matches!(
        note.event,
        DuelEvent::DuelCompleted { winner: CHALLENGER, .. }
    ));

    assert!(service.active_for(CHALLENGER).unwrap().is_none());
}

#[tokio::test]
async fn test_tie_enters_sudden_death_one_round_at_a_time() {
    let service = service(16, 2);
    let duel = service
        .create_challenge(CHALLENGER, OPPONENT, "math".to_string(), Difficulty::Medium)
        .unwrap();
    service.accept(duel.id, OPPONENT).await.unwrap();

    // Both correct, both correct: 2-2 after the fixed rounds.
    play_round(&service, duel.id, 1, 0, 0).await;
    play_round(&service, duel.id, 2, 0, 0).await;

    let (tied, _) = service.get(duel.id, CHALLENGER).unwrap();
    assert_eq!(tied.status, DuelStatus::InProgress);
    assert!(tied.sudden_death);
    assert_eq!(tied.challenger_score, tied.opponent_score);
    // Exactly one extra round appended, not a batch.
    assert_eq!(tied.questions.len(), 3);

    // Non-decisive sudden-death round (both wrong): one more round appended.
    play_round(&service, duel.id, 3, 1, 1).await;
    let (still_tied, _) = service.get(duel.id, CHALLENGER).unwrap();
    assert_eq!(still_tied.status, DuelStatus::InProgress);
    assert_eq!(still_tied.questions.len(), 4);

    // Decisive round: opponent alone is correct and wins outright, despite
    // equal cumulative scores.
    play_round(&service, duel.id, 4, 1, 0).await;
    let (finished, _) = service.get(duel.id, CHALLENGER).unwrap();
    assert_eq!(finished.status, DuelStatus::Completed);
    assert_eq!(finished.winner, Some(OPPONENT));
    assert!(finished.challenger_score < finished.opponent_score || finished.sudden_death);
}

#[tokio::test]
async fn test_concurrent_submissions_resolve_round_once() {
    let service = service(16, 2);
    let duel = service
        .create_challenge(CHALLENGER, OPPONENT, "math".to_string(), Difficulty::Medium)
        .unwrap();
    service.accept(duel.id, OPPONENT).await.unwrap();

    let a = {
        let service = Arc::clone(&service);
        let duel_id = duel.id;
        tokio::spawn(async move { service.submit_answer(duel_id, CHALLENGER, 1, 0).await })
    };
    let b = {
        let service = Arc::clone(&service);
        let duel_id = duel.id;
        tokio::spawn(async move { service.submit_answer(duel_id, OPPONENT, 1, 0).await })
    };

    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    let (after, _) = service.get(duel.id, CHALLENGER).unwrap();
    // Neither answer lost, round resolved exactly once, scores applied once.
    assert_eq!(after.current_round, 1);
    assert_eq!(after.challenger_score, 1);
    assert_eq!(after.opponent_score, 1);
    assert_eq!(after.questions.len(), 2);
    assert!(after.questions[0].is_resolved());

    // A repeat submission for the settled round is rejected with no effect.
    let err = service
        .submit_answer(duel.id, CHALLENGER, 1, 0)
        .await
        .unwrap_err();
    assert!(matches!(err, DuelError::RoundMismatch { submitted: 1, active: 2 }));
    let (unchanged, _) = service.get(duel.id, CHALLENGER).unwrap();
    assert_eq!(unchanged.challenger_score, 1);
}

#[tokio::test]
async fn test_question_pool_exhaustion_cancels_duel() {
    let service = service(1, 2);
    let duel = service
        .create_challenge(CHALLENGER, OPPONENT, "math".to_string(), Difficulty::Medium)
        .unwrap();
    service.accept(duel.id, OPPONENT).await.unwrap();

    // The only question is used by round 1; resolving it needs round 2.
    play_round(&service, duel.id, 1, 0, 1).await;

    let (cancelled, _) = service.get(duel.id, CHALLENGER).unwrap();
    assert_eq!(cancelled.status, DuelStatus::Cancelled);
    assert_eq!(
        cancelled.cancel_reason,
        Some(CancelReason::QuestionPoolExhausted)
    );
    // The resolved round still counted before cancellation.
    assert_eq!(cancelled.challenger_score, 1);
    assert_eq!(cancelled.winner, None);
}

#[tokio::test]
async fn test_accept_with_empty_pool_cancels_duel() {
    let service = service(0, 2);
    let duel = service
        .create_challenge(CHALLENGER, OPPONENT, "math".to_string(), Difficulty::Medium)
        .unwrap();

    let err = service.accept(duel.id, OPPONENT).await.unwrap_err();
    assert!(matches!(err, DuelError::NoQuestionsAvailable { .. }));

    let (cancelled, _) = service.get(duel.id, OPPONENT).unwrap();
    assert_eq!(cancelled.status, DuelStatus::Cancelled);
    assert_eq!(
        cancelled.cancel_reason,
        Some(CancelReason::QuestionPoolExhausted)
    );
}

#[tokio::test]
async fn test_terminal_duels_release_notification_topics() {
    let service = service(64, 2);

    for _ in 0..10 {
        let duel = service
            .create_challenge(CHALLENGER, OPPONENT, "math".to_string(), Difficulty::Medium)
            .unwrap();
        service.accept(duel.id, OPPONENT).await.unwrap();

        // Subscriber connects and disconnects mid-duel, as an SSE client
        // closing its stream would.
        let rx = service.hub().subscribe(Topic::Duel(duel.id));
        drop(rx);

        play_round(&service, duel.id, 1, 0, 1).await;
        play_round(&service, duel.id, 2, 0, 1).await;

        let (finished, _) = service.get(duel.id, CHALLENGER).unwrap();
        assert_eq!(finished.status, DuelStatus::Completed);
    }

    // No channel survives its duel.
    assert_eq!(service.hub().topic_count(), 0);
}

#[tokio::test]
async fn test_accept_rejected_while_participant_is_in_active_duel() {
    const THIRD: u64 = 30;
    let service = service(64, 1);

    let first = service
        .create_challenge(CHALLENGER, OPPONENT, "math".to_string(), Difficulty::Medium)
        .unwrap();
    service.accept(first.id, OPPONENT).await.unwrap();

    // A second challenge can be issued but not accepted while the opponent
    // is mid-duel.
    let second = service
        .create_challenge(THIRD, OPPONENT, "math".to_string(), Difficulty::Medium)
        .unwrap();
    let err = service.accept(second.id, OPPONENT).await.unwrap_err();
    assert!(matches!(err, DuelError::AlreadyInDuel(OPPONENT)));

    let (still_pending, _) = service.get(second.id, OPPONENT).unwrap();
    assert_eq!(still_pending.status, DuelStatus::Pending);

    // Once the first duel finishes, the held-back challenge goes through.
    play_round(&service, first.id, 1, 0, 1).await;
    let (finished, _) = service.get(first.id, CHALLENGER).unwrap();
    assert_eq!(finished.status, DuelStatus::Completed);

    let accepted = service.accept(second.id, OPPONENT).await.unwrap();
    assert_eq!(accepted.status, DuelStatus::InProgress);
}

#[tokio::test]
async fn test_pending_challenge_expiry() {
    let service = service(16, 2);
    let duel = service
        .create_challenge(CHALLENGER, OPPONENT, "math".to_string(), Difficulty::Medium)
        .unwrap();

    // Nothing is old enough yet.
    assert!(service.expire_pending(60_000).await.unwrap().is_empty());

    let expired = service.expire_pending(0).await.unwrap();
    assert_eq!(expired, vec![duel.id]);

    let (timed_out, _) = service.get(duel.id, OPPONENT).unwrap();
    assert_eq!(timed_out.status, DuelStatus::Cancelled);
    assert_eq!(timed_out.cancel_reason, Some(CancelReason::TimedOut));

    let err = service.accept(duel.id, OPPONENT).await.unwrap_err();
    assert!(matches!(err, DuelError::InvalidState { .. }));
}

#[tokio::test]
async fn test_get_requires_participant() {
    let service = service(16, 2);
    let duel = service
        .create_challenge(CHALLENGER, OPPONENT, "math".to_string(), Difficulty::Medium)
        .unwrap();

    assert!(service.get(duel.id, CHALLENGER).is_ok());
    assert!(matches!(
        service.get(duel.id, 99),
        Err(DuelError::NotAuthorized(99))
    ));
    assert!(matches!(service.get(404, CHALLENGER), Err(DuelError::NotFound(404))));
}

#[tokio::test]
async fn test_challenge_notifies_opponent_topic() {
    let service = service(16, 2);
    let mut rx = service.hub().subscribe(Topic::User(OPPONENT));

    let duel = service
        .create_challenge(CHALLENGER, OPPONENT, "math".to_string(), Difficulty::Medium)
        .unwrap();

    let note = rx.recv().await.unwrap();
    assert_eq!(note.duel_id, duel.id);
    match note.event {
        DuelEvent::ChallengeReceived {
            challenger,
            subject,
            ..
        } => {
            assert_eq!(challenger, CHALLENGER);
            assert_eq!(subject, "math");
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test]
async fn test_scores_bounded_by_rounds_played() {
    let service = service(16, 3);
    let duel = service
        .create_challenge(CHALLENGER, OPPONENT, "math".to_string(), Difficulty::Medium)
        .unwrap();
    service.accept(duel.id, OPPONENT).await.unwrap();

    play_round(&service, duel.id, 1, 0, 0).await;
    play_round(&service, duel.id, 2, 0, 1).await;
    play_round(&service, duel.id, 3, 1, 1).await;

    let (finished, _) = service.get(duel.id, CHALLENGER).unwrap();
    assert_eq!(finished.status, DuelStatus::Completed);
    assert_eq!(finished.winner, Some(CHALLENGER));
    // Each side earns at most one point per resolved round.
    let resolved = finished.questions.iter().filter(|q| q.is_resolved()).count() as u32;
    assert!(finished.challenger_score <= resolved);
    assert!(finished.opponent_score <= resolved);
}
