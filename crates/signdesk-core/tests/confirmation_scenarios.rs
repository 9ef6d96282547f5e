use signdesk_core::confirmation::{
    CommandOutcome, ConfirmationEvent, Formation, LetterConfirmationEngine, WordCommand,
};
use signdesk_core::recognition::Observation;
use std::time::{Duration, Instant};

fn observe(
    engine: &mut LetterConfirmationEngine,
    t0: Instant,
    letter: char,
    secs: f64,
) -> ConfirmationEvent {
    engine.observe(&Observation::new(
        letter,
        0.95,
        t0 + Duration::from_secs_f64(secs),
    ))
}

#[test]
fn spelling_a_word_end_to_end() {
    let t0 = Instant::now();
    let mut engine = LetterConfirmationEngine::new(Duration::from_secs(3));

    assert_eq!(
        observe(&mut engine, t0, 'A', 0.0),
        ConfirmationEvent::NewPendingLetter('A')
    );
    assert_eq!(observe(&mut engine, t0, 'A', 0.6), ConfirmationEvent::NoChange);
    assert_eq!(
        observe(&mut engine, t0, 'A', 3.1),
        ConfirmationEvent::LetterConfirmed('A')
    );
    assert_eq!(engine.word().text(), "A");

    assert_eq!(
        observe(&mut engine, t0, 'B', 3.2),
        ConfirmationEvent::NewPendingLetter('B')
    );
    assert_eq!(engine.word().text(), "A");
    assert_eq!(
        observe(&mut engine, t0, 'B', 6.3),
        ConfirmationEvent::LetterConfirmed('B')
    );
    assert_eq!(engine.word().text(), "AB");

    assert_eq!(engine.apply(WordCommand::AddSpace), CommandOutcome::Applied);
    assert_eq!(engine.word().text(), "AB ");
    assert_eq!(engine.formation(), Formation::Active);
    assert_eq!(engine.pending_letter(), None);

    assert_eq!(
        engine.apply(WordCommand::CompleteWord),
        CommandOutcome::Completed {
            word: "AB ".to_string()
        }
    );
    assert_eq!(observe(&mut engine, t0, 'C', 7.0), ConfirmationEvent::NoChange);
    assert_eq!(observe(&mut engine, t0, 'C', 10.5), ConfirmationEvent::NoChange);
    assert_eq!(engine.word().text(), "AB ");
    assert_eq!(engine.formation(), Formation::Frozen);
}

#[test]
fn steady_hold_confirms_exactly_once() {
    let t0 = Instant::now();
    let mut engine = LetterConfirmationEngine::new(Duration::from_secs(3));

    let mut confirmations = 0;
    let mut t = 0.0;
    while t <= 5.0 {
        if let ConfirmationEvent::LetterConfirmed(_) = observe(&mut engine, t0, 'L', t) {
            confirmations += 1;
        }
        t += 0.5;
    }

    // After confirmation the letter is pending again from scratch, so a
    // hold of five seconds yields one commit, not two.
    assert_eq!(confirmations, 1);
    assert_eq!(engine.word().text(), "L");
}

#[test]
fn flicker_never_confirms_the_first_hold() {
    let t0 = Instant::now();
    let mut engine = LetterConfirmationEngine::new(Duration::from_secs(3));

    for (letter, secs) in [('A', 0.0), ('A', 1.0), ('B', 2.0), ('A', 3.0)] {
        observe(&mut engine, t0, letter, secs);
    }
    assert_eq!(observe(&mut engine, t0, 'A', 4.0), ConfirmationEvent::NoChange);
    assert!(engine.word().is_empty());
}
