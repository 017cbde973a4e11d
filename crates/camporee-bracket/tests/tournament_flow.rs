//! End-to-end tournament flows through [`BracketService`].
//!
//! These tests drive the service the way a judge station does, against the
//! in-memory repository and queue, and check the bracket invariants after
//! each step.

#![allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::too_many_lines,
    clippy::unreachable
)]

use std::collections::BTreeMap;

use camporee_bracket::BracketError;
use camporee_bracket::advancement::AdvanceStep;
use camporee_bracket::challenge::ChallengeOutcome;
use camporee_bracket::roster::Roster;
use camporee_bracket::rounds::{HeatEntry, StartOutcome};
use camporee_bracket::service::BracketService;
use camporee_bracket::store::{MemoryQueue, MemoryRepository};
use camporee_types::{
    BYES_HEAT_NAME, Entity, EntityId, EntityType, GameId, HeatId, ResultOutcome, RoundRef,
    SCRATCHED_HEAT_NAME, Standing,
};
use serde_json::Value;

type Service = BracketService<MemoryRepository, MemoryQueue>;

fn id(raw: &str) -> EntityId {
    EntityId::new(raw)
}

fn ids(raw: &[&str]) -> Vec<EntityId> {
    raw.iter().map(|s| id(s)).collect()
}

fn game() -> GameId {
    GameId::new("p12")
}

fn service(teams: &[&str]) -> Service {
    let roster = Roster::new(
        teams
            .iter()
            .enumerate()
            .map(|(n, raw)| Entity {
                id: id(raw),
                name: format!("Patrol {raw}"),
                troop_number: format!("1{n:02}"),
                entity_type: EntityType::Patrol,
            })
            .collect(),
    );
    BracketService::new(MemoryRepository::new(), MemoryQueue::new(), roster)
}

/// Create a heat, mark `winners` to advance, and quick-save it.
fn decide(svc: &mut Service, at: RoundRef, teams: &[&str], winners: &[&str]) -> HeatId {
    let heat = svc.create_heat(&game(), at, &ids(teams)).unwrap();
    for w in winners {
        svc.mark_advance(&game(), at, heat, &id(w), true).unwrap();
    }
    svc.quick_save(&game(), at, heat).unwrap();
    heat
}

fn assert_no_duplicates(svc: &Service) {
    let state = svc.snapshot(&game()).unwrap();
    assert!(
        state.duplicate_entities().is_empty(),
        "duplicates: {:?}",
        state.duplicate_entities()
    );
}

fn ranks(standings: &[Standing]) -> Vec<(String, u32)> {
    standings
        .iter()
        .map(|s| (s.entity_id.to_string(), s.rank))
        .collect()
}

fn pair(raw: &str, rank: u32) -> (String, u32) {
    (raw.to_owned(), rank)
}

/// Main: w beats c1, l beats c2, x and y both go out; round 2 w beats l.
/// Consolation: c1 beats x, c2 beats y; then c1 beats c2.
fn played_out() -> Service {
    let mut svc = service(&["w", "l", "c1", "c2", "x", "y"]);
    svc.start_event(&game(), &ids(&["w", "l", "c1", "c2", "x", "y"]))
        .unwrap();

    let r1 = RoundRef::main(0);
    decide(&mut svc, r1, &["w", "c1"], &["w"]);
    decide(&mut svc, r1, &["l", "c2"], &["l"]);
    decide(&mut svc, r1, &["x", "y"], &[]);
    let step = svc.advance_round(&game(), r1).unwrap();
    assert!(matches!(step.step, AdvanceStep::NextRound { .. }));

    let r2 = RoundRef::main(1);
    decide(&mut svc, r2, &["w", "l"], &["w"]);
    assert!(svc.advance_round(&game(), r2).unwrap().is_final());

    let c1 = RoundRef::consolation(0);
    decide(&mut svc, c1, &["c1", "x"], &["c1"]);
    decide(&mut svc, c1, &["c2", "y"], &["c2"]);
    assert!(!svc.advance_round(&game(), c1).unwrap().is_final());

    let c2 = RoundRef::consolation(1);
    decide(&mut svc, c2, &["c1", "c2"], &["c1"]);
    assert!(svc.advance_round(&game(), c2).unwrap().is_final());

    assert_no_duplicates(&svc);
    svc
}

#[test]
fn starting_twice_is_idempotent() {
    let mut svc = service(&["a", "b", "c"]);
    let first = svc.start_event(&game(), &ids(&["a", "b", "c"])).unwrap();
    assert!(matches!(first, StartOutcome::Created { .. }));
    let before = svc.snapshot(&game()).unwrap();

    let second = svc.start_event(&game(), &ids(&["a", "b", "c"])).unwrap();
    assert_eq!(second, StartOutcome::Merged { added: Vec::new() });
    assert_eq!(svc.snapshot(&game()).unwrap(), before);
}

#[test]
fn validation_errors_do_not_save() {
    let mut svc = service(&["a", "b"]);
    assert!(matches!(
        svc.start_event(&game(), &ids(&["a"])),
        Err(BracketError::NotEnoughTeams { count: 1 })
    ));
    assert!(matches!(
        svc.start_event(&game(), &ids(&["a", "zz"])),
        Err(BracketError::UnknownEntity(_))
    ));
    assert_eq!(svc.repository().save_count(), 0);

    svc.start_event(&game(), &ids(&["a", "b"])).unwrap();
    assert!(matches!(
        svc.create_heat(&game(), RoundRef::main(0), &[]),
        Err(BracketError::EmptyHeatSelection)
    ));
    assert!(matches!(
        svc.advance_round(&game(), RoundRef::main(0)),
        Err(BracketError::NoWinners(_))
    ));
    assert_eq!(svc.repository().save_count(), 1);
}

#[test]
fn advancing_with_a_pending_pool() {
    let mut svc = service(&["a", "b", "c"]);
    svc.start_event(&game(), &ids(&["a", "b", "c"])).unwrap();
    let r1 = RoundRef::main(0);
    decide(&mut svc, r1, &["a", "b"], &["a"]);
    svc.set_final_round(&game(), r1, Some(false)).unwrap();

    let outcome = svc.advance_round(&game(), r1).unwrap();
    assert_eq!(outcome.warning().as_deref(), Some("pending-count: 1"));

    let state = svc.snapshot(&game()).unwrap();
    assert!(state.rounds[1].pool.contains(&id("a")));
    assert!(state.consolation_rounds[0].pool.contains(&id("b")));
    assert_eq!(state.rounds[0].pool, ids(&["c"]));
    assert_no_duplicates(&svc);
}

#[test]
fn bye_and_scratch_through_the_service() {
    let mut svc = service(&["x", "y", "z"]);
    svc.start_event(&game(), &ids(&["x", "y", "z"])).unwrap();
    let r1 = RoundRef::main(0);
    assert!(svc.grant_bye(&game(), r1, &id("x")).unwrap());
    assert!(svc.scratch_team(&game(), r1, &id("y")).unwrap());

    let state = svc.snapshot(&game()).unwrap();
    let round = &state.rounds[0];
    assert_eq!(round.pool, ids(&["z"]));

    let byes = round.heats.iter().find(|h| h.name == BYES_HEAT_NAME).unwrap();
    assert!(byes.complete);
    assert_eq!(
        byes.results[&id("x")].outcome,
        ResultOutcome::Advance { advance: true }
    );

    let scratched = round
        .heats
        .iter()
        .find(|h| h.name == SCRATCHED_HEAT_NAME)
        .unwrap();
    assert!(scratched.complete);
    assert_eq!(
        scratched.results[&id("y")].outcome,
        ResultOutcome::Advance { advance: false }
    );
    assert_no_duplicates(&svc);
}

#[test]
fn saving_a_heat_twice_keeps_one_submission_per_team() {
    let mut svc = service(&["a", "b"]);
    svc.start_event(&game(), &ids(&["a", "b"])).unwrap();
    let r1 = RoundRef::main(0);
    let heat = svc.create_heat(&game(), r1, &ids(&["a", "b"])).unwrap();
    let entries = vec![
        HeatEntry {
            entity_id: id("a"),
            values: BTreeMap::from([(String::from("time"), Value::from("02:10"))]),
            advance: true,
            notes: None,
        },
        HeatEntry {
            entity_id: id("b"),
            values: BTreeMap::from([(String::from("time"), Value::from("02:45"))]),
            advance: false,
            notes: None,
        },
    ];

    let first = svc.save_heat(&game(), r1, heat, &entries).unwrap();
    let second = svc.save_heat(&game(), r1, heat, &entries).unwrap();
    assert_eq!(first.queued, 2);
    assert_eq!(
        first.heat.records.iter().map(|(_, r)| r.uuid).collect::<Vec<_>>(),
        second.heat.records.iter().map(|(_, r)| r.uuid).collect::<Vec<_>>()
    );

    let queue = svc.queue();
    assert_eq!(queue.appended(), 4);
    assert_eq!(queue.entries().len(), 2);
    let packet = &queue.entries()[0].packet;
    assert_eq!(packet.score_payload["heat"], Value::from("Heat 1"));
    assert_eq!(packet.score_payload["round"], Value::from("Round 1"));
    assert_eq!(svc.queue_counts().unwrap().unsynced, 2);
}

#[test]
fn standings_without_challenge_match() {
    let mut svc = played_out();
    let standings = svc.standings(&game()).unwrap();
    assert_eq!(
        ranks(&standings),
        vec![
            pair("w", 1),
            pair("l", 2),
            pair("c1", 3),
            pair("c2", 4),
            pair("x", 5),
            pair("y", 5),
        ]
    );
    let notes: Vec<&str> = standings.iter().map(|s| s.note.as_str()).collect();
    assert_eq!(
        notes,
        vec![
            "Champion",
            "Runner-up",
            "Consolation Winner",
            "Consolation Runner-up",
            "Eliminated in Round 1",
            "Eliminated in Round 1",
        ]
    );
}

#[test]
fn standings_with_challenge_match() {
    let mut svc = played_out();
    let created = svc.create_challenge(&game(), None).unwrap();
    let ChallengeOutcome::Created { round, runner_up, consolation_winner } = created else {
        unreachable!("challenge should be new");
    };
    assert_eq!((runner_up, consolation_winner), (id("l"), id("c1")));
    assert!(matches!(
        svc.create_challenge(&game(), None).unwrap(),
        ChallengeOutcome::Existing { .. }
    ));

    let heat = svc.snapshot(&game()).unwrap().rounds[round.index].heats[0].id;
    svc.mark_advance(&game(), round, heat, &id("c1"), true).unwrap();
    svc.quick_save(&game(), round, heat).unwrap();
    assert!(svc.advance_round(&game(), round).unwrap().is_final());

    let standings = svc.standings(&game()).unwrap();
    assert_eq!(
        ranks(&standings),
        vec![
            pair("w", 1),
            pair("c1", 2),
            pair("l", 3),
            pair("c2", 4),
            pair("x", 5),
            pair("y", 5),
        ]
    );
}

#[test]
fn review_overrides_then_submit() {
    let mut svc = played_out();
    svc.standings(&game()).unwrap();
    let swapped = svc.place_above(&game(), &id("c1"), &id("l")).unwrap();
    assert_eq!(ranks(&swapped)[1..3].to_vec(), vec![pair("c1", 2), pair("l", 3)]);

    let again = svc.place_above(&game(), &id("c1"), &id("l")).unwrap();
    assert_eq!(again, swapped);

    let edited = svc.override_rank(&game(), &id("y"), 6).unwrap();
    assert!(edited.iter().any(|s| s.entity_id == id("y") && s.rank == 6 && s.manual));

    let queued = svc.submit_standings(&game()).unwrap();
    assert_eq!(queued, 6);
    let notes: Vec<Value> = svc
        .queue()
        .entries()
        .iter()
        .map(|e| e.packet.score_payload["notes"].clone())
        .collect();
    assert!(notes.contains(&Value::from("Tournament Place: 1st")));
    assert!(notes.contains(&Value::from("Tournament Place: 6th")));

    // The review is gone; asking again recomputes from the bracket.
    let fresh = svc.standings(&game()).unwrap();
    assert!(fresh.iter().all(|s| !s.manual));
}

#[test]
fn manual_consolation_lookup_when_not_synced() {
    let mut svc = service(&["w", "l", "c9"]);
    svc.start_event(&game(), &ids(&["w", "l"])).unwrap();
    decide(&mut svc, RoundRef::main(0), &["w", "l"], &["w"]);

    assert!(matches!(
        svc.create_challenge(&game(), None),
        Err(BracketError::ConsolationWinnerUnknown)
    ));
    assert!(matches!(
        svc.create_challenge(&game(), Some(&id("nobody"))),
        Err(BracketError::UnknownEntity(_))
    ));

    let found = svc.roster().search("patrol c9");
    assert_eq!(found.len(), 1);
    let fallback = found[0].id.clone();
    let outcome = svc.create_challenge(&game(), Some(&fallback)).unwrap();
    assert!(matches!(
        outcome,
        ChallengeOutcome::Created { consolation_winner, .. } if consolation_winner == id("c9")
    ));
}

#[test]
fn empty_bracket_has_no_standings() {
    let mut svc = service(&["a", "b"]);
    assert!(matches!(
        svc.standings(&game()),
        Err(BracketError::NoStandings(_))
    ));
}
