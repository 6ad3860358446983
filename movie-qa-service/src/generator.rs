use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use movie_retrieval::{Movie, Retrieval, RetrievalContext, RetrievalError};
use rig::agent::Agent;
use rig::completion::Chat;
use rig::client::CompletionClient;
use rig::providers::openrouter;
use thiserror::Error;
use tracing::{error, info, warn};

/// Longest movie list rendered into a prompt
pub const MAX_LISTED_MOVIES: usize = 25;

/// Text generation backend behind the assistant
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, prompt: &str) -> anyhow::Result<String>;
}

/// Generator backed by an OpenRouter-hosted chat model
pub struct OpenRouterGenerator {
    agent: Agent<openrouter::CompletionModel>,
}

impl OpenRouterGenerator {
    pub fn new(api_key: &str, model_name: &str, max_new_tokens: u64) -> Self {
        let client = openrouter::Client::new(api_key);
        let agent = client.agent(model_name).max_tokens(max_new_tokens).build();
        Self { agent }
    }
}

#[async_trait]
impl TextGenerator for OpenRouterGenerator {
    async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
        let answer = self.agent.chat(prompt, vec![]).await?;
        Ok(answer)
    }
}

#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("Error during answer generation: {0}")]
    Generation(String),
}

/// Answers movie questions: retrieval first, then generation over the retrieved context
#[derive(Clone)]
pub struct MovieAssistant {
    retrieval: Retrieval,
    generator: Arc<dyn TextGenerator>,
}

impl MovieAssistant {
    pub fn new(retrieval: Retrieval, generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            retrieval,
            generator,
        }
    }

    pub fn retrieval(&self) -> &Retrieval {
        &self.retrieval
    }

    pub async fn answer(&self, query: &str) -> Result<String, AssistantError> {
        let retrieved = self.retrieval.process(query).await;
        match &retrieved {
            Ok(context) => info!(intent = %context.intent(), "Retrieved context"),
            Err(e) if e.is_missing_entity() => warn!(error = %e, "Retrieval found no entity"),
            Err(e) => error!(error = %e, "Retrieval failed, answering without catalog data"),
        }

        let prompt = build_prompt(&context_block(&retrieved), query);
        let answer = self.generator.complete(&prompt).await.map_err(|e| {
            error!(error = %e, "Answer generation failed");
            AssistantError::Generation(e.to_string())
        })?;

        info!(answer_length = answer.len(), "Answer generated");
        Ok(answer)
    }
}

/// Text handed to the model as context. Retrieval failures become an explanatory line so
/// the model can still reply.
pub fn context_block(retrieved: &Result<RetrievalContext, RetrievalError>) -> String {
    match retrieved {
        Ok(context) => render_context(context),
        Err(e) => format!("Error during retrieval: {e}"),
    }
}

pub fn build_prompt(context: &str, query: &str) -> String {
    format!(
        r#"You are a helpful movie assistant.
Use the provided data to answer naturally.

Context:
{context}

User question:
{query}"#
    )
}

fn describe_movie(movie: &Movie) -> String {
    let year = movie
        .year
        .map(|y| y.to_string())
        .unwrap_or_else(|| "year unknown".to_string());
    if movie.genres.is_empty() {
        format!("{} ({year})", movie.title)
    } else {
        format!("{} ({year}) [{}]", movie.title, movie.genres.join(", "))
    }
}

fn write_movie_list(out: &mut String, movies: &[Movie]) {
    for movie in movies.iter().take(MAX_LISTED_MOVIES) {
        let _ = writeln!(out, "- {}", describe_movie(movie));
    }
    if movies.len() > MAX_LISTED_MOVIES {
        let _ = writeln!(out, "...and {} more", movies.len() - MAX_LISTED_MOVIES);
    }
}

pub fn render_context(context: &RetrievalContext) -> String {
    let mut out = String::new();
    match context {
        RetrievalContext::General { movie, info: None } => {
            let _ = writeln!(out, "No movie matching \"{movie}\" was found in the catalog.");
        }
        RetrievalContext::General {
            info: Some(info), ..
        } => {
            let movie = &info.movie;
            let _ = writeln!(out, "Title: {}", movie.title);
            let _ = writeln!(
                out,
                "Year: {}",
                movie.year.map(|y| y.to_string()).unwrap_or_else(|| "unknown".to_string())
            );
            let _ = writeln!(out, "Genres: {}", movie.genres.join(", "));
            if info.tags.is_empty() {
                let _ = writeln!(out, "Tags: none");
            } else {
                let _ = writeln!(out, "Tags: {}", info.tags.join(", "));
            }
        }
        RetrievalContext::SimilarMovies {
            movie,
            similar_movies,
        } => {
            if similar_movies.is_empty() {
                let _ = writeln!(out, "No similar movies were found for \"{movie}\".");
            } else {
                let _ = writeln!(out, "Movies sharing a genre with \"{movie}\":");
                write_movie_list(&mut out, similar_movies);
            }
        }
        RetrievalContext::RecommendByYear {
            year,
            movies_by_year,
        } => {
            if movies_by_year.is_empty() {
                let _ = writeln!(out, "No movies released in {year} were found.");
            } else {
                let _ = writeln!(out, "Movies released in {year}:");
                write_movie_list(&mut out, movies_by_year);
            }
        }
    }
    out.trim_end().to_string()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use movie_retrieval::{EntityKind, InMemoryCatalog, MovieInfo};
    use std::sync::Mutex;

    /// Echoes the prompt back and remembers it
    #[derive(Default)]
    pub(crate) struct EchoGenerator {
        pub(crate) prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TextGenerator for EchoGenerator {
        async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(format!("ECHO: {prompt}"))
        }
    }

    pub(crate) struct FailingGenerator;

    #[async_trait]
    impl TextGenerator for FailingGenerator {
        async fn complete(&self, _prompt: &str) -> anyhow::Result<String> {
            Err(anyhow::anyhow!("model unavailable"))
        }
    }

    pub(crate) fn movie(id: i64, title: &str, year: Option<i32>, genres: &[&str]) -> Movie {
        Movie {
            id,
            title: title.to_string(),
            year,
            genres: genres.iter().map(|g| g.to_string()).collect(),
        }
    }

    pub(crate) fn sample_retrieval() -> Retrieval {
        let catalog = InMemoryCatalog::new()
            .with_movie(movie(1, "Inception", Some(2010), &["Action", "Sci-Fi"]))
            .with_movie(movie(2, "The Matrix", Some(1999), &["Action", "Sci-Fi"]))
            .with_movie(movie(3, "Fight Club", Some(1999), &["Drama"]))
            .with_tag(1, "dreams")
            .with_rating(1, 4.5)
            .with_rating(3, 3.5);
        Retrieval::new(Arc::new(catalog))
    }

    #[test]
    fn renders_general_info() {
        let context = RetrievalContext::General {
            movie: "Inception".to_string(),
            info: Some(MovieInfo {
                movie: movie(1, "Inception", Some(2010), &["Action", "Sci-Fi"]),
                tags: vec!["dreams".to_string(), "heist".to_string()],
            }),
        };
        assert_eq!(
            render_context(&context),
            "Title: Inception\nYear: 2010\nGenres: Action, Sci-Fi\nTags: dreams, heist"
        );
    }

    #[test]
    fn renders_empty_results_as_no_data() {
        let general = RetrievalContext::General {
            movie: "Solaris".to_string(),
            info: None,
        };
        assert!(render_context(&general).contains("No movie matching \"Solaris\""));

        let similar = RetrievalContext::SimilarMovies {
            movie: "Solaris".to_string(),
            similar_movies: vec![],
        };
        assert!(render_context(&similar).starts_with("No similar movies"));

        let by_year = RetrievalContext::RecommendByYear {
            year: 1901,
            movies_by_year: vec![],
        };
        assert_eq!(render_context(&by_year), "No movies released in 1901 were found.");
    }

    #[test]
    fn long_lists_are_truncated() {
        let movies: Vec<Movie> = (0..30)
            .map(|i| movie(i, &format!("Movie {i}"), Some(1999), &["Drama"]))
            .collect();
        let rendered = render_context(&RetrievalContext::RecommendByYear {
            year: 1999,
            movies_by_year: movies,
        });
        assert_eq!(rendered.lines().filter(|l| l.starts_with("- ")).count(), 25);
        assert!(rendered.ends_with("...and 5 more"));
        assert!(rendered.contains("- Movie 0 (1999) [Drama]"));
    }

    #[test]
    fn retrieval_errors_become_context_text() {
        let retrieved = Err(RetrievalError::MissingEntity(EntityKind::Year));
        assert_eq!(
            context_block(&retrieved),
            "Error during retrieval: No year found in input"
        );
    }

    #[test]
    fn prompt_contains_context_and_question() {
        let prompt = build_prompt("Title: Heat", "Tell me about Heat");
        assert!(prompt.starts_with("You are a helpful movie assistant."));
        assert!(prompt.contains("Context:\nTitle: Heat\n"));
        assert!(prompt.ends_with("User question:\nTell me about Heat"));
    }

    #[tokio::test]
    async fn answer_uses_retrieved_context() {
        let generator = Arc::new(EchoGenerator::default());
        let assistant = MovieAssistant::new(sample_retrieval(), generator.clone());

        let answer = assistant.answer("Tell me about Inception").await.unwrap();

        assert!(answer.starts_with("ECHO: "));
        let prompts = generator.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Title: Inception"));
        assert!(prompts[0].contains("Tags: dreams"));
    }

    #[tokio::test]
    async fn missing_entity_degrades_to_fallback_context() {
        let generator = Arc::new(EchoGenerator::default());
        let assistant = MovieAssistant::new(sample_retrieval(), generator.clone());

        assistant.answer("recommend a good movie").await.unwrap();

        let prompts = generator.prompts.lock().unwrap();
        assert!(prompts[0].contains("Error during retrieval: No movie name found in input"));
        assert!(prompts[0].ends_with("recommend a good movie"));
    }

    #[tokio::test]
    async fn generation_failure_is_reported() {
        let assistant = MovieAssistant::new(sample_retrieval(), Arc::new(FailingGenerator));
        let err = assistant.answer("Tell me about Inception").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error during answer generation: model unavailable"
        );
    }
}
