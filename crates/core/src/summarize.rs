//! Map-reduce summarization over transcript chunks.
//!
//! Every chunk is summarized on its own (map). The partial summaries are then
//! combined into one synopsis (reduce). When the partial summaries together
//! are too large for a single combine request, they are collapsed group by
//! group first, as many passes as needed, until they fit.

use tracing::{debug, info};

use crate::{
    chunker::{Chunk, ChunkerConfig, MIN_CHUNK_SIZE, TextChunker},
    error::{ConfigurationError, InferenceFailure},
    llm::LanguageModel,
    tokens::TokenCounter,
};

/// Largest amount of summary text sent in one combine request, in tokens.
pub const DEFAULT_REDUCE_TOKEN_MAX: usize = 3000;

pub const DEFAULT_MAX_COLLAPSE_PASSES: usize = 8;

static MAP_PROMPT: &str = r#"You summarize one excerpt of a longer video transcript.

Write a concise summary of the excerpt you are given.
- Keep names, numbers and technical terms exactly as spoken
- Do not mention that this is an excerpt or a transcript
- Output ONLY the summary, nothing else"#;

static COMBINE_PROMPT: &str = r#"You merge partial summaries of one video into a single synopsis.

The summaries you are given cover consecutive parts of the same video, in order.
Write one concise summary of the whole.
- Remove repetition between the parts
- Keep the order in which topics come up
- Output ONLY the summary, nothing else"#;

fn map_request(text: &str) -> String {
    format!("Summarize this excerpt:\n\n{}", text)
}

fn combine_request(summaries: &str) -> String {
    format!("Combine these summaries:\n\n{}", summaries)
}

fn join_summaries<S: AsRef<str>>(summaries: &[S]) -> String {
    summaries
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummarizerConfig {
    temperature: f32,
    reduce: ChunkerConfig,
    max_collapse_passes: usize,
}

impl SummarizerConfig {
    pub fn new(temperature: f32) -> Result<Self, ConfigurationError> {
        if !(0.0..=1.0).contains(&temperature) {
            return Err(ConfigurationError::TemperatureOutOfRange { temperature });
        }

        Ok(Self {
            temperature,
            reduce: ChunkerConfig::new(DEFAULT_REDUCE_TOKEN_MAX, 0)?,
            max_collapse_passes: DEFAULT_MAX_COLLAPSE_PASSES,
        })
    }

    /// Token budget for the summaries packed into one combine request.
    ///
    /// Only the joined summaries are measured. The combine system prompt and
    /// the short request header come on top, so leave the model that much
    /// headroom beyond `budget`.
    pub fn with_reduce_token_max(mut self, budget: usize) -> Result<Self, ConfigurationError> {
        if budget < MIN_CHUNK_SIZE {
            return Err(ConfigurationError::ReduceBudgetTooSmall {
                budget,
                minimum: MIN_CHUNK_SIZE,
            });
        }
        self.reduce = ChunkerConfig::new(budget, 0)?;
        Ok(self)
    }

    pub fn with_max_collapse_passes(mut self, passes: usize) -> Self {
        self.max_collapse_passes = passes;
        self
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn reduce_token_max(&self) -> usize {
        self.reduce.max_size()
    }
}

pub struct MapReduceSummarizer<'m, M: ?Sized, C> {
    model: &'m M,
    counter: C,
    config: SummarizerConfig,
}

impl<'m, M, C> MapReduceSummarizer<'m, M, C>
where
    M: LanguageModel + ?Sized,
    C: TokenCounter,
{
    pub fn new(model: &'m M, counter: C, config: SummarizerConfig) -> Self {
        Self {
            model,
            counter,
            config,
        }
    }

    /// Summarize every chunk, then reduce the partial summaries to one.
    pub async fn summarize<'t, I>(&self, chunks: I) -> Result<String, InferenceFailure>
    where
        I: IntoIterator<Item = Chunk<'t>>,
    {
        let mut partials = Vec::new();
        for chunk in chunks {
            debug!(
                index = chunk.index,
                tokens = chunk.token_count,
                "summarizing chunk"
            );
            let partial = self
                .model
                .complete(MAP_PROMPT, &map_request(chunk.text), self.config.temperature)
                .await?;
            partials.push(partial);
        }

        if partials.is_empty() {
            return Err(InferenceFailure::EmptyInput);
        }
        info!(partials = partials.len(), "map phase complete");

        let partials = self.collapse(partials).await?;
        let combined = join_summaries(&partials);

        info!(partials = partials.len(), "reducing to final summary");
        self.model
            .complete(
                COMBINE_PROMPT,
                &combine_request(&combined),
                self.config.temperature,
            )
            .await
    }

    /// Collapse partial summaries until together they fit one combine request.
    async fn collapse(&self, mut partials: Vec<String>) -> Result<Vec<String>, InferenceFailure> {
        let budget = self.config.reduce_token_max();
        let mut passes = 0;

        while self.counter.count(&join_summaries(&partials)) > budget {
            if passes == self.config.max_collapse_passes {
                return Err(InferenceFailure::ReduceDiverged { passes, budget });
            }
            passes += 1;

            let groups = self.group(&partials);
            debug!(
                pass = passes,
                items = partials.len(),
                groups = groups.len(),
                "collapsing partial summaries"
            );

            let mut collapsed = Vec::with_capacity(groups.len());
            for group in &groups {
                let summary = self
                    .model
                    .complete(
                        COMBINE_PROMPT,
                        &combine_request(group),
                        self.config.temperature,
                    )
                    .await?;
                collapsed.push(summary);
            }
            partials = collapsed;
        }

        Ok(partials)
    }

    /// Pack consecutive summaries into groups that each fit the budget.
    /// A summary over the budget on its own is chunked first.
    fn group(&self, partials: &[String]) -> Vec<String> {
        let budget = self.config.reduce_token_max();
        let chunker = TextChunker::new(self.config.reduce.clone(), &self.counter);

        let mut items: Vec<&str> = Vec::new();
        for partial in partials {
            if self.counter.count(partial) > budget {
                items.extend(chunker.chunks(partial).map(|chunk| chunk.text));
            } else {
                items.push(partial);
            }
        }

        let mut groups = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        for item in items {
            current.push(item);
            if current.len() > 1 && self.counter.count(&join_summaries(&current)) > budget {
                current.pop();
                groups.push(join_summaries(&current));
                current = vec![item];
            }
        }
        if !current.is_empty() {
            groups.push(join_summaries(&current));
        }

        groups
    }
}
