use chorewheel_core::{
    AssignStrategy, AssignmentCounts, Chore, ChoreError, ChoreHistory, ChoreLifecycle,
    ChoreStatus, CircleMember, CircleRole, CompletionRequest, EngineConfig, FixedClock,
    HistoryStatus, MemberId, Recurrence, RecurrenceRule, RuleError,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use uuid::Uuid;

const CREATOR: MemberId = 1;
const ADMIN: MemberId = 9;
const OUTSIDER: MemberId = 7;

fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

fn lifecycle_with(config: EngineConfig) -> ChoreLifecycle<FixedClock> {
    ChoreLifecycle::new(&config, FixedClock::new(utc(2024, 1, 3, 12)))
}

fn lifecycle() -> ChoreLifecycle<FixedClock> {
    lifecycle_with(EngineConfig::default())
}

fn members(circle_id: Uuid) -> Vec<CircleMember> {
    vec![
        CircleMember::new(circle_id, CREATOR, CircleRole::Member),
        CircleMember::new(circle_id, 2, CircleRole::Member),
        CircleMember::new(circle_id, 3, CircleRole::Member),
        CircleMember::new(circle_id, OUTSIDER, CircleRole::Member),
        CircleMember::new(circle_id, ADMIN, CircleRole::Admin),
    ]
}

fn weekly_chore(strategy: AssignStrategy) -> Chore {
    let mut chore = Chore::new(
        Uuid::new_v4(),
        "take out trash",
        RecurrenceRule::new(Recurrence::Weekly { every: 1 }),
        CREATOR,
        utc(2023, 12, 20, 9),
    );
    chore.assignees = vec![1, 2, 3];
    chore.assigned_to = Some(1);
    chore.assign_strategy = strategy;
    chore.next_due_date = Some(utc(2024, 1, 1, 0));
    chore.points = Some(5);
    chore
}

#[test]
fn assignee_completion_advances_schedule_and_rotation() {
    let chore = weekly_chore(AssignStrategy::RoundRobin);
    let members = members(chore.circle_id);
    let counts = AssignmentCounts::new();
    let performed_at = utc(2024, 1, 2, 18);

    let outcome = lifecycle()
        .complete(
            &chore,
            &[],
            CompletionRequest::new(2, &members, &counts)
                .at(performed_at)
                .with_note("done early"),
            &mut StdRng::seed_from_u64(1),
        )
        .expect("assignee can complete");

    assert_eq!(outcome.entry.chore_id, chore.id);
    assert_eq!(outcome.entry.completed_by, 2);
    assert_eq!(outcome.entry.assigned_to, Some(1));
    assert_eq!(outcome.entry.due_date, Some(utc(2024, 1, 1, 0)));
    assert_eq!(outcome.entry.status, HistoryStatus::Completed);
    assert_eq!(outcome.entry.points, Some(5));
    assert_eq!(outcome.entry.note.as_deref(), Some("done early"));

    assert_eq!(outcome.chore.next_due_date, Some(utc(2024, 1, 8, 0)));
    assert_eq!(outcome.chore.assigned_to, Some(2));
    assert!(outcome.chore.is_active);
    assert_eq!(outcome.chore.updated_at, performed_at);
    assert_eq!(outcome.chore.updated_by, Some(2));
    // Input snapshot is untouched.
    assert_eq!(chore.assigned_to, Some(1));
}

#[test]
fn outsider_cannot_complete_but_admin_can() {
    let chore = weekly_chore(AssignStrategy::KeepLastAssigned);
    let members = members(chore.circle_id);
    let counts = AssignmentCounts::new();
    let lifecycle = lifecycle();

    let err = lifecycle
        .complete(
            &chore,
            &[],
            CompletionRequest::new(OUTSIDER, &members, &counts),
            &mut StdRng::seed_from_u64(1),
        )
        .unwrap_err();
    assert_eq!(
        err,
        ChoreError::PermissionDenied {
            actor: OUTSIDER,
            chore_id: chore.id,
        }
    );

    let outcome = lifecycle
        .complete(
            &chore,
            &[],
            CompletionRequest::new(ADMIN, &members, &counts),
            &mut StdRng::seed_from_u64(1),
        )
        .expect("admin can complete");
    assert_eq!(outcome.entry.completed_by, ADMIN);
    assert_eq!(outcome.chore.assigned_to, Some(1));
}

#[test]
fn performed_at_defaults_to_clock_and_points_can_be_overridden() {
    let chore = weekly_chore(AssignStrategy::KeepLastAssigned);
    let members = members(chore.circle_id);
    let counts = AssignmentCounts::new();

    let outcome = lifecycle()
        .complete(
            &chore,
            &[],
            CompletionRequest::new(CREATOR, &members, &counts).with_points(8),
            &mut StdRng::seed_from_u64(1),
        )
        .expect("complete");
    assert_eq!(outcome.entry.performed_at, utc(2024, 1, 3, 12));
    assert_eq!(outcome.entry.points, Some(8));
}

#[test]
fn once_chore_becomes_inactive_after_completion() {
    let mut chore = weekly_chore(AssignStrategy::RoundRobin);
    chore.rule = RecurrenceRule::new(Recurrence::Once);
    let members = members(chore.circle_id);
    let counts = AssignmentCounts::new();
    let lifecycle = lifecycle();

    let outcome = lifecycle
        .complete(
            &chore,
            &[],
            CompletionRequest::new(CREATOR, &members, &counts),
            &mut StdRng::seed_from_u64(1),
        )
        .expect("complete once chore");
    assert!(!outcome.chore.is_active);
    assert_eq!(outcome.chore.next_due_date, None);
    assert_eq!(outcome.chore.assigned_to, Some(1));

    let err = lifecycle
        .complete(
            &outcome.chore,
            &[outcome.entry],
            CompletionRequest::new(CREATOR, &members, &counts),
            &mut StdRng::seed_from_u64(1),
        )
        .unwrap_err();
    assert_eq!(err, ChoreError::Inactive(chore.id));
}

#[test]
fn skip_rotates_by_default_without_points() {
    let chore = weekly_chore(AssignStrategy::RoundRobin);
    let members = members(chore.circle_id);
    let counts = AssignmentCounts::new();

    let outcome = lifecycle()
        .skip(
            &chore,
            &[],
            CompletionRequest::new(1, &members, &counts).at(utc(2024, 1, 1, 8)),
            &mut StdRng::seed_from_u64(1),
        )
        .expect("skip");
    assert_eq!(outcome.entry.status, HistoryStatus::Skipped);
    assert_eq!(outcome.entry.points, None);
    assert_eq!(outcome.chore.assigned_to, Some(2));
    assert_eq!(outcome.chore.next_due_date, Some(utc(2024, 1, 8, 0)));
}

#[test]
fn skip_keeps_assignee_when_rotation_on_skip_is_disabled() {
    let chore = weekly_chore(AssignStrategy::RoundRobin);
    let members = members(chore.circle_id);
    let counts = AssignmentCounts::new();
    let config = EngineConfig {
        rotate_on_skip: false,
        ..EngineConfig::default()
    };

    let outcome = lifecycle_with(config)
        .skip(
            &chore,
            &[],
            CompletionRequest::new(1, &members, &counts),
            &mut StdRng::seed_from_u64(1),
        )
        .expect("skip");
    assert_eq!(outcome.chore.assigned_to, Some(1));
    assert_eq!(outcome.chore.next_due_date, Some(utc(2024, 1, 8, 0)));
}

#[test]
fn completion_window_blocks_early_completion_only() {
    let mut chore = weekly_chore(AssignStrategy::KeepLastAssigned);
    chore.next_due_date = Some(utc(2024, 1, 8, 12));
    chore.completion_window = Some(3600);
    let members = members(chore.circle_id);
    let counts = AssignmentCounts::new();
    let lifecycle = lifecycle();

    let err = lifecycle
        .complete(
            &chore,
            &[],
            CompletionRequest::new(1, &members, &counts).at(utc(2024, 1, 8, 10)),
            &mut StdRng::seed_from_u64(1),
        )
        .unwrap_err();
    assert_eq!(
        err,
        ChoreError::CompletionWindowNotOpen {
            chore_id: chore.id,
            opens_at: utc(2024, 1, 8, 11),
        }
    );

    lifecycle
        .skip(
            &chore,
            &[],
            CompletionRequest::new(1, &members, &counts).at(utc(2024, 1, 8, 10)),
            &mut StdRng::seed_from_u64(1),
        )
        .expect("skip ignores the window");

    lifecycle
        .complete(
            &chore,
            &[],
            CompletionRequest::new(1, &members, &counts)
                .at(utc(2024, 1, 8, 11) + Duration::minutes(30)),
            &mut StdRng::seed_from_u64(1),
        )
        .expect("completion inside window");
}

#[test]
fn in_progress_resets_and_paused_is_kept() {
    let mut chore = weekly_chore(AssignStrategy::KeepLastAssigned);
    let members = members(chore.circle_id);
    let counts = AssignmentCounts::new();
    let lifecycle = lifecycle();

    chore.status = ChoreStatus::InProgress;
    let outcome = lifecycle
        .complete(
            &chore,
            &[],
            CompletionRequest::new(1, &members, &counts),
            &mut StdRng::seed_from_u64(1),
        )
        .expect("complete");
    assert_eq!(outcome.chore.status, ChoreStatus::NoStatus);

    chore.status = ChoreStatus::Paused;
    let outcome = lifecycle
        .complete(
            &chore,
            &[],
            CompletionRequest::new(1, &members, &counts),
            &mut StdRng::seed_from_u64(1),
        )
        .expect("complete");
    assert_eq!(outcome.chore.status, ChoreStatus::Paused);
}

#[test]
fn least_completed_counts_the_new_completion() {
    let chore = weekly_chore(AssignStrategy::LeastCompleted);
    let members = members(chore.circle_id);
    let counts = AssignmentCounts::new();
    let prior = |member: MemberId, day: u32| ChoreHistory {
        chore_id: chore.id,
        performed_at: utc(2023, 12, day, 9),
        completed_by: member,
        assigned_to: Some(member),
        due_date: None,
        status: HistoryStatus::Completed,
        points: None,
        note: None,
    };
    let history = vec![prior(3, 28), prior(1, 21)];

    let outcome = lifecycle()
        .complete(
            &chore,
            &history,
            CompletionRequest::new(2, &members, &counts),
            &mut StdRng::seed_from_u64(1),
        )
        .expect("complete");
    // Everyone has one completion now; the tie goes to the lowest id.
    assert_eq!(outcome.chore.assigned_to, Some(1));
}

#[test]
fn malformed_chore_is_rejected_before_any_change() {
    let mut chore = weekly_chore(AssignStrategy::RoundRobin);
    chore.assigned_to = Some(5);
    let members = members(chore.circle_id);
    let counts = AssignmentCounts::new();

    let err = lifecycle()
        .complete(
            &chore,
            &[],
            CompletionRequest::new(1, &members, &counts),
            &mut StdRng::seed_from_u64(1),
        )
        .unwrap_err();
    assert!(matches!(err, ChoreError::InvalidChore(_)));

    let mut chore = weekly_chore(AssignStrategy::RoundRobin);
    chore.rule = RecurrenceRule::new(Recurrence::Daily { every: 0 });
    let err = lifecycle()
        .complete(
            &chore,
            &[],
            CompletionRequest::new(1, &members, &counts),
            &mut StdRng::seed_from_u64(1),
        )
        .unwrap_err();
    assert!(matches!(err, ChoreError::InvalidRule(_)));
}

#[test]
fn trigger_chore_waits_for_event_after_completion() {
    let mut chore = weekly_chore(AssignStrategy::KeepLastAssigned);
    chore.rule = RecurrenceRule::new(Recurrence::Trigger);
    let members = members(chore.circle_id);
    let counts = AssignmentCounts::new();
    let lifecycle = lifecycle();

    let outcome = lifecycle
        .complete(
            &chore,
            &[],
            CompletionRequest::new(1, &members, &counts),
            &mut StdRng::seed_from_u64(1),
        )
        .expect("complete trigger chore");
    assert!(outcome.chore.is_active);
    assert_eq!(outcome.chore.next_due_date, None);

    let mut finished = outcome.chore;
    finished.updated_by = Some(42);
    let due_at = utc(2024, 2, 1, 7);
    let scheduled = lifecycle
        .trigger(&finished, 3, &members, due_at)
        .expect("trigger schedules chore");
    assert_eq!(scheduled.next_due_date, Some(due_at));
    assert_eq!(scheduled.updated_at, utc(2024, 1, 3, 12));
    assert_eq!(scheduled.updated_by, Some(3));

    let err = lifecycle
        .trigger(&finished, OUTSIDER, &members, due_at)
        .unwrap_err();
    assert!(matches!(err, ChoreError::PermissionDenied { actor: OUTSIDER, .. }));
}

#[test]
fn trigger_rejects_calendar_rules() {
    let chore = weekly_chore(AssignStrategy::KeepLastAssigned);
    let members = members(chore.circle_id);
    let err = lifecycle()
        .trigger(&chore, CREATOR, &members, utc(2024, 2, 1, 7))
        .unwrap_err();
    assert_eq!(
        err,
        ChoreError::InvalidRule(RuleError::NotTriggerBased(chore.rule.frequency_type()))
    );
}

#[test]
fn finished_chore_reports_permission_before_state() {
    let mut chore = weekly_chore(AssignStrategy::KeepLastAssigned);
    chore.rule = RecurrenceRule::new(Recurrence::Once);
    chore.is_active = false;
    let members = members(chore.circle_id);
    let counts = AssignmentCounts::new();
    let lifecycle = lifecycle();

    let err = lifecycle
        .complete(
            &chore,
            &[],
            CompletionRequest::new(OUTSIDER, &members, &counts),
            &mut StdRng::seed_from_u64(1),
        )
        .unwrap_err();
    assert_eq!(
        err,
        ChoreError::PermissionDenied {
            actor: OUTSIDER,
            chore_id: chore.id,
        }
    );

    let err = lifecycle
        .skip(
            &chore,
            &[],
            CompletionRequest::new(2, &members, &counts),
            &mut StdRng::seed_from_u64(1),
        )
        .unwrap_err();
    assert_eq!(err, ChoreError::Inactive(chore.id));

    chore.rule = RecurrenceRule::new(Recurrence::Trigger);
    let err = lifecycle
        .trigger(&chore, OUTSIDER, &members, utc(2024, 2, 1, 7))
        .unwrap_err();
    assert!(matches!(err, ChoreError::PermissionDenied { .. }));
    let err = lifecycle
        .trigger(&chore, CREATOR, &members, utc(2024, 2, 1, 7))
        .unwrap_err();
    assert_eq!(err, ChoreError::Inactive(chore.id));
}
