use chrono::Duration;
use quest_core::model::{
    AnswerMap, Difficulty, Grade, GradeLevel, JoinCode, ProgressRecord, Question, QuestionId,
    Quiz, QuizSource, Score, TopicCategory, TopicDraft, UserDraft,
};
use quest_core::time::fixed_now;
use storage::repository::{
    ClassroomRepository, NewClassroomRecord, ProgressRepository, QuizRepository, StorageError,
    TopicRepository, UserRepository,
};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

#[tokio::test]
async fn sqlite_roundtrips_topics_with_prerequisites() {
    let repo = connect("memdb_topics").await;
    let now = fixed_now();

    let teacher = repo
        .insert_user(&UserDraft::teacher("Ms Rivera").validate(now).unwrap())
        .await
        .unwrap();
    let counting = repo
        .insert_topic(
            &TopicDraft::new("Counting", TopicCategory::Arithmetic)
                .validate(now)
                .unwrap(),
        )
        .await
        .unwrap();
    let adding = repo
        .insert_topic(
            &TopicDraft::new("Adding", TopicCategory::Arithmetic)
                .validate(now)
                .unwrap(),
        )
        .await
        .unwrap();
    let fractions = repo
        .insert_topic(
            &TopicDraft::new("Fractions", TopicCategory::Fractions)
                .with_description("Halves and quarters")
                .with_level(GradeLevel::Grade(Grade::new(4).unwrap()))
                .with_xp_reward(250)
                .with_prerequisites([adding.id(), counting.id()])
                .with_author(teacher.id())
                .validate(now)
                .unwrap(),
        )
        .await
        .unwrap();

    let fetched = repo.get_topic(fractions.id()).await.unwrap().unwrap();
    assert_eq!(fetched, fractions);
    assert_eq!(fetched.prerequisites(), &[adding.id(), counting.id()]);

    let edited = fetched
        .edit(
            TopicDraft::new("Fractions", TopicCategory::Fractions)
                .with_prerequisites([counting.id()]),
        )
        .unwrap();
    repo.update_topic(&edited).await.unwrap();

    let all = repo.list_topics().await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[2].prerequisites(), &[counting.id()]);
    assert_eq!(all[2].author(), Some(teacher.id()));
    assert!(repo.get_topic(quest_core::model::TopicId::new(99)).await.unwrap().is_none());
}

#[tokio::test]
async fn sqlite_keeps_one_progress_row_per_user_and_topic() {
    let repo = connect("memdb_progress").await;
    let now = fixed_now();

    let student = repo
        .insert_user(
            &UserDraft::student("Ada", Some(Grade::new(4).unwrap()))
                .validate(now)
                .unwrap(),
        )
        .await
        .unwrap();
    let topic = repo
        .insert_topic(
            &TopicDraft::new("Counting", TopicCategory::Arithmetic)
                .validate(now)
                .unwrap(),
        )
        .await
        .unwrap();

    let answers: AnswerMap = [(QuestionId::new(1), 2)].into_iter().collect();
    let mut record = ProgressRecord::first_attempt(
        student.id(),
        topic.id(),
        Score::new(40).unwrap(),
        answers,
        now,
    );
    repo.upsert_progress(&record).await.unwrap();
    assert!(repo.completed_topics(student.id()).await.unwrap().is_empty());

    record.record_attempt(Score::new(85).unwrap(), AnswerMap::new(), now + Duration::hours(1));
    repo.upsert_progress(&record).await.unwrap();

    let stored = repo.list_progress(student.id()).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0], record);
    assert_eq!(stored[0].attempts(), 2);
    assert!(
        repo.completed_topics(student.id())
            .await
            .unwrap()
            .contains(&topic.id())
    );
}

#[tokio::test]
async fn sqlite_writes_completion_and_xp_together() {
    let repo = connect("memdb_completion").await;
    let now = fixed_now();

    let mut student = repo
        .insert_user(&UserDraft::student("Ben", None).validate(now).unwrap())
        .await
        .unwrap();
    let topic = repo
        .insert_topic(
            &TopicDraft::new("Shapes", TopicCategory::Geometry)
                .with_xp_reward(250)
                .validate(now)
                .unwrap(),
        )
        .await
        .unwrap();
    let record = ProgressRecord::first_attempt(
        student.id(),
        topic.id(),
        Score::new(90).unwrap(),
        AnswerMap::new(),
        now,
    );

    student.award_xp(topic.xp_reward());
    repo.record_completion(&record, &student).await.unwrap();
    assert_eq!(repo.get_user(student.id()).await.unwrap().unwrap().xp(), 250);
    assert_eq!(repo.list_progress(student.id()).await.unwrap(), vec![record]);

    let ghost = UserDraft::student("Ghost", None)
        .validate(now)
        .unwrap()
        .assign_id(quest_core::model::UserId::new(404));
    let orphan = ProgressRecord::first_attempt(
        ghost.id(),
        topic.id(),
        Score::new(90).unwrap(),
        AnswerMap::new(),
        now,
    );
    assert!(repo.record_completion(&orphan, &ghost).await.is_err());
    assert!(repo.list_progress(ghost.id()).await.unwrap().is_empty());
}

#[tokio::test]
async fn sqlite_persists_user_xp_and_classrooms() {
    let repo = connect("memdb_classrooms").await;
    let now = fixed_now();

    let teacher = repo
        .insert_user(&UserDraft::teacher("Mr Okafor").validate(now).unwrap())
        .await
        .unwrap();
    let mut student = repo
        .insert_user(&UserDraft::student("Ben", None).validate(now).unwrap())
        .await
        .unwrap();
    student.award_xp(600);
    repo.update_user(&student).await.unwrap();
    let reloaded = repo.get_user(student.id()).await.unwrap().unwrap();
    assert_eq!(reloaded.xp(), 600);
    assert_eq!(reloaded.level(), 2);

    let topic = repo
        .insert_topic(
            &TopicDraft::new("Shapes", TopicCategory::Geometry)
                .validate(now)
                .unwrap(),
        )
        .await
        .unwrap();

    let code = JoinCode::parse("MATH42").unwrap();
    let mut classroom = repo
        .insert_classroom(NewClassroomRecord {
            name: "Year 5".into(),
            teacher_id: teacher.id(),
            join_code: code.clone(),
            created_at: now,
        })
        .await
        .unwrap();
    classroom.add_member(student.id());
    classroom.assign_topic(topic.id());
    repo.update_classroom(&classroom).await.unwrap();

    let found = repo.find_by_join_code(&code).await.unwrap().unwrap();
    assert_eq!(found, classroom);
    assert_eq!(repo.classrooms_for_user(student.id()).await.unwrap().len(), 1);
    assert_eq!(repo.classrooms_for_user(teacher.id()).await.unwrap().len(), 1);

    let clash = repo
        .insert_classroom(NewClassroomRecord {
            name: "Year 6".into(),
            teacher_id: teacher.id(),
            join_code: code,
            created_at: now,
        })
        .await
        .unwrap_err();
    assert!(matches!(clash, StorageError::Conflict));
}

#[tokio::test]
async fn sqlite_roundtrips_quizzes() {
    let repo = connect("memdb_quizzes").await;
    let now = fixed_now();

    let teacher = repo
        .insert_user(&UserDraft::teacher("Ms Rivera").validate(now).unwrap())
        .await
        .unwrap();
    let topic = repo
        .insert_topic(
            &TopicDraft::new("Equations", TopicCategory::Algebra)
                .validate(now)
                .unwrap(),
        )
        .await
        .unwrap();

    let question = Question::new(
        QuestionId::new(1),
        "Solve: x + 2 = 5",
        vec!["2".into(), "3".into(), "7".into()],
        1,
        Difficulty::Easy,
        TopicCategory::Algebra,
        Some("Subtract 2.".into()),
    )
    .unwrap();
    let quiz = Quiz::new(
        topic.id(),
        "Warm-up",
        QuizSource::Teacher(teacher.id()),
        vec![question],
    )
    .unwrap();

    let id = repo.insert_quiz(&quiz).await.unwrap();
    assert_eq!(repo.get_quiz(id).await.unwrap(), Some(quiz.clone()));

    let listed = repo.quizzes_for_topic(topic.id()).await.unwrap();
    assert_eq!(listed, vec![(id, quiz)]);
}
