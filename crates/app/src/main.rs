use std::io::{self, BufRead, Write};

use anyhow::{Context, Result, bail};
use clap::Parser;
use quest_core::model::{AnswerMap, Difficulty, Quiz, TopicId, UserId};
use quest_core::prerequisites::TopicStatus;
use quest_core::question_bank::get_question_stats;
use services::{AppServices, Clock};
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod cli;
mod seed;

use cli::{Cli, Command};

/// Settings resolved from flags and environment.
#[derive(Debug, Clone)]
struct AppConfig {
    db_url: String,
}

impl From<&Cli> for AppConfig {
    fn from(cli: &Cli) -> Self {
        Self {
            db_url: cli.db_url.clone(),
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = AppConfig::from(&cli);
    debug!(db = %config.db_url, "opening database");

    let services = AppServices::new_sqlite(&config.db_url, Clock::system())
        .await
        .with_context(|| format!("open database {}", config.db_url))?;

    match cli.command {
        Command::Seed => seed::seed(&services).await,
        Command::Users => list_users(&services).await,
        Command::Map { user } => show_map(&services, user).await,
        Command::Topic { user, topic } => show_topic(&services, user, topic).await,
        Command::Quiz {
            user,
            topic,
            count,
            difficulty,
            answers,
        } => take_quiz(&services, user, topic, count, difficulty, answers).await,
        Command::Join { user, code } => {
            let outcome = services.classrooms().join_by_code(user, &code).await?;
            if outcome.newly_joined {
                println!("Joined {}.", outcome.classroom.name());
            } else {
                println!("Already a member of {}.", outcome.classroom.name());
            }
            Ok(())
        }
        Command::Profile { user } => show_profile(&services, user).await,
        Command::Leaderboard { limit } => show_leaderboard(&services, limit).await,
        Command::Stats => {
            show_stats();
            Ok(())
        }
    }
}

async fn list_users(services: &AppServices) -> Result<()> {
    for user in services.users().list_users().await? {
        let grade = user.grade().map(|g| g.to_string()).unwrap_or_default();
        println!(
            "{:>3}  {:<12} {:<8} {grade}",
            user.id(),
            user.name(),
            user.role().as_str()
        );
    }
    Ok(())
}

fn status_marker(status: &TopicStatus) -> &'static str {
    match status {
        TopicStatus::Completed => "[x]",
        TopicStatus::Available => "[ ]",
        TopicStatus::Locked { .. } => "[#]",
    }
}

async fn show_map(services: &AppServices, user: UserId) -> Result<()> {
    let map = services.learning_map().learning_map(user).await?;
    println!(
        "{} (level {}, {} xp)",
        map.user.name(),
        map.user.level(),
        map.user.xp()
    );
    for entry in &map.entries {
        let score = entry
            .best_score
            .map(|s| format!(" best {s}"))
            .unwrap_or_default();
        println!(
            "{} {:>3}  {:<28} {:<12} {:>4} xp{score}",
            status_marker(&entry.status),
            entry.topic.id(),
            entry.topic.title(),
            entry.topic.category(),
            entry.topic.xp_reward(),
        );
    }
    println!(
        "{} completed, {} available, {} locked",
        map.completed_count(),
        map.available_count(),
        map.locked_count()
    );
    Ok(())
}

async fn show_topic(services: &AppServices, user: UserId, topic: TopicId) -> Result<()> {
    let detail = services.learning_map().topic_detail(user, topic).await?;
    println!("{} ({})", detail.topic.title(), detail.status.label());
    if let Some(description) = detail.topic.description() {
        println!("{description}");
    }
    println!(
        "{} | {} | {} xp",
        detail.topic.category(),
        detail.topic.level(),
        detail.topic.xp_reward()
    );
    if let Some(record) = &detail.record {
        println!("best score {} after {} attempt(s)", record.score(), record.attempts());
    }
    for (id, title) in &detail.missing {
        println!("  requires {id}: {title}");
    }
    Ok(())
}

fn prompt_answers(quiz: &Quiz) -> Result<Vec<usize>> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut chosen = Vec::with_capacity(quiz.questions().len());
    for (n, question) in quiz.questions().iter().enumerate() {
        println!("\n{}. {}", n + 1, question.prompt());
        for (i, option) in question.options().iter().enumerate() {
            println!("   {i}) {option}");
        }
        print!("> ");
        io::stdout().flush()?;
        let line = lines.next().context("no answer given")??;
        let choice = line
            .trim()
            .parse::<usize>()
            .with_context(|| format!("not an option number: {}", line.trim()))?;
        chosen.push(choice);
    }
    Ok(chosen)
}

/// Fail before generating questions when the attempt would be rejected.
async fn ensure_playable(services: &AppServices, user: UserId, topic: TopicId) -> Result<()> {
    let detail = services.learning_map().topic_detail(user, topic).await?;
    if detail.status.is_locked() {
        let missing: Vec<&str> = detail
            .missing
            .iter()
            .map(|(_, title)| title.as_str())
            .collect();
        bail!(
            "{} is locked; complete {} first",
            detail.topic.title(),
            missing.join(", ")
        );
    }
    Ok(())
}

async fn take_quiz(
    services: &AppServices,
    user: UserId,
    topic: TopicId,
    count: usize,
    difficulty: Option<Difficulty>,
    answers: Option<Vec<usize>>,
) -> Result<()> {
    ensure_playable(services, user, topic).await?;

    let quizzes = services.quizzes();
    let quiz = quizzes.generate_quiz(topic, count, difficulty).await?;
    println!(
        "{} ({} questions, {})",
        quiz.title(),
        quiz.questions().len(),
        quiz.source().as_str()
    );

    let chosen = match answers {
        Some(given) => given,
        None => prompt_answers(&quiz)?,
    };
    if chosen.len() > quiz.questions().len() {
        bail!(
            "{} answers given for {} questions",
            chosen.len(),
            quiz.questions().len()
        );
    }
    let answers: AnswerMap = quiz
        .questions()
        .iter()
        .zip(chosen)
        .map(|(q, choice)| (q.id(), choice))
        .collect();

    let graded = quizzes.grade_quiz(user, &quiz, answers).await?;
    for question in quiz.questions() {
        if graded.result.missed.contains(&question.id()) {
            let answer = question
                .options()
                .get(question.correct())
                .map_or("", String::as_str);
            println!("missed: {} -> {answer}", question.prompt());
            if let Some(explanation) = question.explanation() {
                println!("        {explanation}");
            }
        }
    }

    let outcome = &graded.outcome;
    println!(
        "\nScore {} ({}/{})",
        graded.result.score, graded.result.correct, graded.result.total
    );
    if outcome.newly_completed() {
        println!("Topic completed! +{} xp", outcome.xp_awarded);
    } else if outcome.record.completed() {
        println!("Already completed; best score {}", outcome.record.score());
    } else {
        println!("Not passed yet; best score {}", outcome.record.score());
    }
    if outcome.level_change.leveled_up() {
        println!("Level up! Now level {}", outcome.level_change.current);
    }
    for id in &outcome.newly_unlocked {
        println!("Unlocked topic {id}");
    }
    Ok(())
}

async fn show_profile(services: &AppServices, user: UserId) -> Result<()> {
    let profile = services.users().profile(user).await?;
    println!(
        "{} ({})",
        profile.user.name(),
        profile.user.role().as_str()
    );
    println!(
        "level {}  xp {}  ({} into level, {} to next)",
        profile.level,
        profile.user.xp(),
        profile.xp_into_level,
        profile.xp_to_next_level
    );
    println!("{} topics completed", profile.completed_topics);
    for class in services.classrooms().classrooms_for(user).await? {
        println!("class: {} ({})", class.name(), class.join_code());
    }
    Ok(())
}

async fn show_leaderboard(services: &AppServices, limit: usize) -> Result<()> {
    for entry in services.leaderboard().top(limit).await? {
        println!(
            "{:>3}. {:<12} level {:>2}  {:>6} xp",
            entry.rank, entry.name, entry.level, entry.xp
        );
    }
    Ok(())
}

fn show_stats() {
    let stats = get_question_stats();
    println!("{} questions", stats.total);
    for (difficulty, n) in &stats.by_difficulty {
        println!("  {difficulty:<12} {n}");
    }
    for (category, n) in &stats.by_category {
        println!("  {category:<12} {n}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quest_core::time::fixed_now;

    async fn seeded() -> AppServices {
        let services = AppServices::in_memory(Clock::fixed(fixed_now()));
        seed::seed(&services).await.unwrap();
        services
    }

    async fn topic_named(services: &AppServices, viewer: UserId, title: &str) -> TopicId {
        services
            .topics()
            .list_topics(viewer)
            .await
            .unwrap()
            .into_iter()
            .find(|t| t.title() == title)
            .unwrap()
            .id()
    }

    #[tokio::test]
    async fn locked_and_hidden_topics_are_refused_before_the_quiz() {
        let services = seeded().await;
        let users = services.users().list_users().await.unwrap();
        let teacher = users[0].id();
        let ada = users.iter().find(|u| u.name() == "Ada").unwrap().id();

        let counting = topic_named(&services, teacher, "Counting & Place Value").await;
        ensure_playable(&services, ada, counting).await.unwrap();

        let adding = topic_named(&services, teacher, "Addition & Subtraction").await;
        let err = ensure_playable(&services, ada, adding).await.unwrap_err();
        assert!(err.to_string().contains("Counting & Place Value"), "{err}");

        let area = topic_named(&services, teacher, "Area").await;
        assert!(ensure_playable(&services, ada, area).await.is_err());
    }
}
