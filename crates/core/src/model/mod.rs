mod classroom;
mod grade;
mod ids;
mod progress;
mod quiz;
mod topic;
mod user;

pub use ids::{ClassroomId, ParseIdError, QuestionId, QuizId, TopicId, UserId};

pub use classroom::{Classroom, ClassroomError, JOIN_CODE_LEN, JoinCode};
pub use grade::{Grade, GradeError, GradeLevel, MAX_GRADE, MIN_GRADE};
pub use progress::{AnswerMap, AttemptOutcome, PASS_MARK, ProgressError, ProgressRecord, Score};
pub use quiz::{Difficulty, Question, Quiz, QuizError, QuizResult, QuizSource};
pub use topic::{DEFAULT_TOPIC_XP, Topic, TopicCategory, TopicDraft, TopicError, ValidatedTopic};
pub use user::{Role, User, UserDraft, UserError, ValidatedUser};
