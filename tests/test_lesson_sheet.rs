mod common;

use common::{lab_lesson, mark, student, three_students, Call, TestJournal};
use lib::journal::error::JournalError;
use lib::journal::models::lesson_model::{
    AttendanceRecord, AttendanceStatus, BulkAttendance, Grade, GradeRecord, GradeUpsert,
    LessonPatch, LessonStatus, LessonType,
};
use lib::journal::models::SheetEdit;
use lib::journal::sheet::LessonSheet;

#[tokio::test]
async fn save_sends_only_marked_students() {
    let journal = TestJournal::default()
        .with_roster(1, three_students())
        .into_arc();
    let mut sheet = LessonSheet::open(journal.clone(), lab_lesson()).await;

    sheet.cycle_attendance(1).unwrap();
    sheet.cycle_attendance(2).unwrap();
    sheet.cycle_attendance(2).unwrap();
    sheet.set_grade(1, Grade::new(5).unwrap()).unwrap();
    assert!(sheet.has_changes());

    sheet.save_all().await.unwrap();

    assert_eq!(
        journal.writes(),
        vec![
            Call::SaveAttendanceBulk(BulkAttendance {
                lesson_id: 10,
                records: vec![
                    mark(1, AttendanceStatus::Present),
                    mark(2, AttendanceStatus::Late)
                ],
            }),
            Call::UpsertGrade(GradeUpsert {
                lesson_id: 10,
                student_id: 1,
                grade: Grade::new(5).unwrap(),
                work_number: Some(2),
            }),
        ]
    );
    assert!(!sheet.has_changes());
    assert_eq!(sheet.attendance(3), None);
}

#[tokio::test]
async fn save_runs_attendance_then_grades_then_status_then_topic() {
    let journal = TestJournal::default()
        .with_roster(1, three_students())
        .into_arc();
    let mut sheet = LessonSheet::open(journal.clone(), lab_lesson()).await;

    sheet.set_topic("Деревья поиска");
    sheet.set_status(LessonStatus::Early);
    sheet.set_grade(3, Grade::new(4).unwrap()).unwrap();
    sheet.set_grade(2, Grade::new(3).unwrap()).unwrap();
    sheet.cycle_attendance(1).unwrap();

    sheet.save_all().await.unwrap();

    let writes = journal.writes();
    assert_eq!(writes.len(), 5);
    assert!(matches!(writes[0], Call::SaveAttendanceBulk(_)));
    assert!(matches!(writes[1], Call::UpsertGrade(_)));
    assert!(matches!(writes[2], Call::UpsertGrade(_)));
    assert_eq!(
        writes[3],
        Call::PatchLesson(LessonPatch {
            lesson_id: 10,
            is_cancelled: Some(false),
            ended_early: Some(true),
            topic: None,
        })
    );
    assert_eq!(
        writes[4],
        Call::PatchLesson(LessonPatch {
            lesson_id: 10,
            topic: Some("Деревья поиска".to_string()),
            ..LessonPatch::default()
        })
    );
    assert_eq!(sheet.lesson().topic, "Деревья поиска");
    assert!(sheet.lesson().ended_early);
}

#[tokio::test]
async fn grading_marks_present_and_same_grade_clears_it() {
    let journal = TestJournal::default()
        .with_roster(1, three_students())
        .into_arc();
    let mut sheet = LessonSheet::open(journal, lab_lesson()).await;
    let four = Grade::new(4).unwrap();

    assert_eq!(sheet.attendance(3), None);
    assert_eq!(sheet.set_grade(3, four).unwrap(), Some(four));
    assert_eq!(sheet.attendance(3), Some(AttendanceStatus::Present));

    assert_eq!(sheet.set_grade(3, four).unwrap(), None);
    assert_eq!(sheet.grade(3), None);
    assert_eq!(sheet.attendance(3), Some(AttendanceStatus::Present));
}

#[tokio::test]
async fn grading_keeps_an_existing_mark() {
    let journal = TestJournal::default()
        .with_roster(1, three_students())
        .into_arc();
    let mut sheet = LessonSheet::open(journal, lab_lesson()).await;

    sheet.cycle_attendance(2).unwrap();
    sheet.cycle_attendance(2).unwrap();
    sheet.set_grade(2, Grade::new(3).unwrap()).unwrap();
    assert_eq!(sheet.attendance(2), Some(AttendanceStatus::Late));
}

#[tokio::test]
async fn grading_a_lecture_is_allowed() {
    let journal = TestJournal::default()
        .with_roster(1, three_students())
        .into_arc();
    let mut lesson = lab_lesson();
    lesson.lesson_type = LessonType::Lecture;
    let mut sheet = LessonSheet::open(journal, lesson).await;

    assert!(sheet.set_grade(1, Grade::new(5).unwrap()).is_ok());
}

#[tokio::test]
async fn failed_save_keeps_changes_and_retry_resumes() {
    let journal = TestJournal::default()
        .with_roster(1, three_students())
        .into_arc();
    let mut sheet = LessonSheet::open(journal.clone(), lab_lesson()).await;
    sheet.cycle_attendance(1).unwrap();
    sheet.set_grade(1, Grade::new(5).unwrap()).unwrap();
    sheet.set_topic("Хеш-таблицы");

    journal.fail_when(|call| matches!(call, Call::UpsertGrade(_)));
    let err = sheet.save_all().await.unwrap_err();
    assert!(matches!(err, JournalError::SaveStep { .. }));
    assert!(sheet.has_changes());
    let log = sheet.save_log().unwrap();
    assert!(log.steps()[0].completed);
    assert!(!log.steps()[1].completed);
    assert!(!log.steps()[2].completed);
    // topic was never sent
    assert_eq!(journal.writes().len(), 2);

    journal.heal();
    journal.clear_calls();
    sheet.save_all().await.unwrap();

    let writes = journal.writes();
    assert_eq!(writes.len(), 2);
    assert!(matches!(writes[0], Call::UpsertGrade(_)));
    assert!(matches!(writes[1], Call::PatchLesson(_)));
    assert!(!sheet.has_changes());
    assert!(sheet.save_log().is_none());
}

#[tokio::test]
async fn retry_resends_what_changed_after_the_failure() {
    let journal = TestJournal::default()
        .with_roster(1, three_students())
        .into_arc();
    let mut sheet = LessonSheet::open(journal.clone(), lab_lesson()).await;
    sheet.cycle_attendance(1).unwrap();
    sheet.set_status(LessonStatus::Cancelled);

    journal.fail_when(|call| matches!(call, Call::PatchLesson(_)));
    assert!(sheet.save_all().await.is_err());

    sheet.cycle_attendance(2).unwrap();
    journal.heal();
    journal.clear_calls();
    sheet.save_all().await.unwrap();

    assert_eq!(
        journal.writes(),
        vec![
            Call::SaveAttendanceBulk(BulkAttendance {
                lesson_id: 10,
                records: vec![
                    mark(1, AttendanceStatus::Present),
                    mark(2, AttendanceStatus::Present)
                ],
            }),
            Call::PatchLesson(LessonPatch::status(10, LessonStatus::Cancelled)),
        ]
    );
}

#[tokio::test]
async fn status_reverted_after_a_partial_save_is_sent_back() {
    let journal = TestJournal::default()
        .with_roster(1, three_students())
        .into_arc();
    let mut sheet = LessonSheet::open(journal.clone(), lab_lesson()).await;
    sheet.set_status(LessonStatus::Cancelled);
    sheet.set_topic("Деревья поиска");

    journal.fail_when(|call| matches!(call, Call::PatchLesson(p) if p.topic.is_some()));
    assert!(sheet.save_all().await.is_err());
    assert!(sheet.lesson().is_cancelled);
    assert_eq!(sheet.lesson().topic, "Связные списки");

    sheet.set_status(LessonStatus::Normal);
    journal.heal();
    journal.clear_calls();
    sheet.save_all().await.unwrap();

    assert_eq!(
        journal.writes(),
        vec![
            Call::PatchLesson(LessonPatch::status(10, LessonStatus::Normal)),
            Call::PatchLesson(LessonPatch::topic(10, "Деревья поиска")),
        ]
    );
    assert!(!sheet.has_changes());
    assert!(!sheet.lesson().is_cancelled);
    assert_eq!(sheet.lesson().topic, "Деревья поиска");
}

#[tokio::test]
async fn reopening_fetches_again() {
    let journal = TestJournal::default()
        .with_roster(1, three_students())
        .into_arc();

    let mut first = LessonSheet::open(journal.clone(), lab_lesson()).await;
    first.cycle_attendance(1).unwrap();
    first.set_topic("Черновик");
    drop(first);

    let second = LessonSheet::open(journal.clone(), lab_lesson()).await;
    assert_eq!(second.attendance(1), None);
    assert_eq!(second.topic(), "Связные списки");
    assert!(!second.has_changes());

    let roster_fetches = journal
        .calls()
        .into_iter()
        .filter(|call| matches!(call, Call::GroupRoster(1)))
        .count();
    assert_eq!(roster_fetches, 2);
}

#[tokio::test]
async fn load_picks_up_saved_marks_and_grades() {
    let mut journal = TestJournal::default().with_roster(1, three_students());
    journal.attendance = vec![
        mark(1, AttendanceStatus::Late),
        AttendanceRecord {
            student_id: 2,
            status: AttendanceStatus::Absent,
            lesson_id: Some(99),
        },
        mark(42, AttendanceStatus::Present),
    ];
    journal.grades = vec![
        GradeRecord {
            student_id: 1,
            grade: Grade::new(4).unwrap(),
            lesson_id: Some(10),
            work_number: Some(2),
        },
        GradeRecord {
            student_id: 2,
            grade: Grade::new(5).unwrap(),
            lesson_id: Some(10),
            work_number: Some(1),
        },
    ];
    let journal = journal.into_arc();

    let sheet = LessonSheet::open(journal.clone(), lab_lesson()).await;

    assert_eq!(sheet.attendance(1), Some(AttendanceStatus::Late));
    assert_eq!(sheet.attendance(2), None);
    assert_eq!(sheet.grade(1), Some(Grade::new(4).unwrap()));
    assert_eq!(sheet.grade(2), None);
    assert!(!sheet.attendance_map().contains_key(&42));
    assert_eq!(
        journal.calls(),
        vec![
            Call::GroupRoster(1),
            Call::LessonAttendance(1, vec![10]),
            Call::LessonGrades(vec![10]),
        ]
    );
}

#[tokio::test]
async fn failed_load_leaves_an_empty_sheet() {
    let journal = TestJournal::default().into_arc();
    let mut sheet = LessonSheet::open(journal, lab_lesson()).await;

    assert!(sheet.students().is_empty());
    assert!(sheet.attendance_map().is_empty());
    assert!(!sheet.has_changes());
    assert_eq!(sheet.topic(), "Связные списки");
    assert!(matches!(
        sheet.try_load().await,
        Err(JournalError::Api { status: 404, .. })
    ));
}

#[tokio::test]
async fn subgroup_lesson_hides_the_other_subgroup() {
    let journal = TestJournal::default()
        .with_roster(
            1,
            vec![
                student(1, "Анна Ахматова", Some(1)),
                student(2, "Борис Пастернак", Some(2)),
                student(3, "Владимир Маяковский", None),
            ],
        )
        .into_arc();
    let mut lesson = lab_lesson();
    lesson.subgroup = Some(1);

    let mut sheet = LessonSheet::open(journal, lesson).await;

    let ids = sheet.students().iter().map(|s| s.id).collect::<Vec<_>>();
    assert_eq!(ids, vec![1, 3]);
    assert!(matches!(
        sheet.cycle_attendance(2),
        Err(JournalError::UnknownStudent(2))
    ));
}

#[tokio::test]
async fn reset_reverts_every_edit() {
    let mut journal = TestJournal::default().with_roster(1, three_students());
    journal.attendance = vec![mark(1, AttendanceStatus::Excused)];
    let journal = journal.into_arc();
    let mut sheet = LessonSheet::open(journal.clone(), lab_lesson()).await;

    sheet.cycle_attendance(1).unwrap();
    sheet.set_grade(2, Grade::new(2).unwrap()).unwrap();
    sheet.set_topic("Другое");
    sheet.set_status(LessonStatus::Cancelled);
    sheet.reset_changes();

    assert!(!sheet.has_changes());
    assert_eq!(sheet.attendance(1), Some(AttendanceStatus::Excused));
    assert_eq!(sheet.attendance(2), None);
    assert_eq!(sheet.grade(2), None);
    assert_eq!(sheet.topic(), "Связные списки");
    assert_eq!(sheet.status(), LessonStatus::Normal);
    assert!(journal.writes().is_empty());
}

#[tokio::test]
async fn saved_topic_is_not_patched_twice() {
    let journal = TestJournal::default()
        .with_roster(1, three_students())
        .into_arc();
    let mut sheet = LessonSheet::open(journal.clone(), lab_lesson()).await;
    sheet.set_topic("Очереди");
    sheet.save_all().await.unwrap();
    journal.clear_calls();

    sheet.save_all().await.unwrap();

    assert!(journal.writes().is_empty());
}

#[tokio::test]
async fn edits_replay_through_apply() {
    let journal = TestJournal::default()
        .with_roster(1, three_students())
        .into_arc();
    let mut sheet = LessonSheet::open(journal, lab_lesson()).await;
    let edits: Vec<SheetEdit> = serde_json::from_str(
        r#"[
            {"op": "cycle", "student_id": 2},
            {"op": "grade", "student_id": 1, "grade": 3},
            {"op": "topic", "topic": "Графы"},
            {"op": "status", "status": "cancelled"}
        ]"#,
    )
    .unwrap();

    for edit in edits.iter() {
        sheet.apply(edit).unwrap();
    }

    assert_eq!(sheet.attendance(2), Some(AttendanceStatus::Present));
    assert_eq!(sheet.attendance(1), Some(AttendanceStatus::Present));
    assert_eq!(sheet.grade(1).map(Grade::value), Some(3));
    assert_eq!(sheet.topic(), "Графы");
    assert_eq!(sheet.status(), LessonStatus::Cancelled);
    assert!(matches!(
        sheet.apply(&SheetEdit::Grade {
            student_id: 1,
            grade: 6
        }),
        Err(JournalError::InvalidGrade(6))
    ));
}
