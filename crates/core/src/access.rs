//! Who may see which topic.
//!
//! Teachers see the whole catalogue. Students see unrestricted topics plus
//! the topics pinned to their own grade; a student without a recorded grade
//! only sees unrestricted topics. A topic may only require prerequisites
//! that every student who sees it can also see.

use crate::model::{GradeLevel, Topic, User};

#[must_use]
pub fn can_view(user: &User, topic: &Topic) -> bool {
    if user.is_teacher() {
        return true;
    }
    match topic.level() {
        GradeLevel::Any => true,
        GradeLevel::Grade(required) => user.grade() == Some(required),
    }
}

/// Topics `user` may view, in the order given.
pub fn visible_topics<'a>(user: &User, topics: &'a [Topic]) -> Vec<&'a Topic> {
    topics.iter().filter(|t| can_view(user, t)).collect()
}

/// Whether a topic at `dependent` level may list a prerequisite at
/// `prerequisite` level. Grade-restricted prerequisites are only allowed for
/// topics restricted to the same grade.
#[must_use]
pub fn can_require(dependent: GradeLevel, prerequisite: GradeLevel) -> bool {
    prerequisite == GradeLevel::Any || prerequisite == dependent
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Grade, Role, TopicCategory, TopicDraft, TopicId, UserId};
    use crate::time::fixed_now;

    fn topic(id: u64, level: GradeLevel) -> Topic {
        TopicDraft::new(format!("Topic {id}"), TopicCategory::Arithmetic)
            .with_level(level)
            .validate(fixed_now())
            .unwrap()
            .assign_id(TopicId::new(id))
            .unwrap()
    }

    fn user(role: Role) -> User {
        User::from_persisted(UserId::new(1), "U".into(), role, 0, fixed_now()).unwrap()
    }

    fn grade(n: u8) -> GradeLevel {
        GradeLevel::Grade(Grade::new(n).unwrap())
    }

    #[test]
    fn student_sees_own_grade_and_open_topics() {
        let student = user(Role::Student {
            grade: Some(Grade::new(4).unwrap()),
        });
        let topics = vec![topic(1, GradeLevel::Any), topic(2, grade(4)), topic(3, grade(5))];

        let ids: Vec<_> = visible_topics(&student, &topics)
            .into_iter()
            .map(Topic::id)
            .collect();
        assert_eq!(ids, vec![TopicId::new(1), TopicId::new(2)]);
    }

    #[test]
    fn student_without_grade_sees_only_open_topics() {
        let student = user(Role::Student { grade: None });
        assert!(can_view(&student, &topic(1, GradeLevel::Any)));
        assert!(!can_view(&student, &topic(2, grade(1))));
    }

    #[test]
    fn teacher_sees_everything() {
        let teacher = user(Role::Teacher);
        assert!(can_view(&teacher, &topic(1, grade(9))));
        assert!(can_view(&teacher, &topic(2, GradeLevel::Any)));
    }

    #[test]
    fn restricted_prerequisites_need_the_same_grade() {
        assert!(can_require(GradeLevel::Any, GradeLevel::Any));
        assert!(can_require(grade(5), GradeLevel::Any));
        assert!(can_require(grade(4), grade(4)));
        assert!(!can_require(grade(5), grade(4)));
        assert!(!can_require(GradeLevel::Any, grade(4)));
    }
}
