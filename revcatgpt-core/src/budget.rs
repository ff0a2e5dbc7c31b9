//! Token budget accounting for assembled context.
//!
//! [`TokenCounter`] counts tokens with the model's own BPE (tiktoken-rs) and
//! prices each fragment as one chat message. [`WithinBudget`] is the stopping
//! rule: it yields fragments in order and ends after the first fragment whose
//! inclusion pushes the running total over the ceiling, so that fragment is
//! still emitted in full.

use crate::error::BudgetError;

/// Default chat model whose tokenizer prices the context.
pub const DEFAULT_TOKEN_MODEL: &str = "gpt-4-0314";

/// Default ceiling on the estimated token cost of one context.
pub const DEFAULT_TOKEN_CEILING: usize = 3000;

/// Tokens added per chat message for role and separators.
const TOKENS_PER_MESSAGE: usize = 3;

/// Tokens the model spends priming its reply.
const REPLY_PRIMING_TOKENS: usize = 3;

/// Token counter using tiktoken-rs for exact BPE tokenization.
pub struct TokenCounter {
    bpe: tiktoken_rs::CoreBPE,
    model: String,
}

impl std::fmt::Debug for TokenCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCounter")
            .field("model", &self.model)
            .finish()
    }
}

impl TokenCounter {
    /// Create a token counter for the given model.
    /// Falls back to cl100k_base if the model isn't recognized.
    pub fn for_model(model: &str) -> Result<Self, BudgetError> {
        let bpe = match tiktoken_rs::get_bpe_from_model(model) {
            Ok(bpe) => bpe,
            Err(_) => {
                tracing::debug!(model, "unknown tokenizer model, using cl100k_base");
                tiktoken_rs::cl100k_base().map_err(|e| BudgetError::Tokenizer {
                    model: model.to_string(),
                    message: e.to_string(),
                })?
            }
        };
        Ok(Self {
            bpe,
            model: model.to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Count the number of tokens in a string.
    pub fn count(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }

    /// Estimate the cost of `text` sent as the content of a single chat
    /// message with an empty role, including reply priming.
    pub fn estimate(&self, text: &str) -> usize {
        TOKENS_PER_MESSAGE + self.count(text) + REPLY_PRIMING_TOKENS
    }
}

/// Running total against a fixed ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenBudget {
    ceiling: usize,
    used: usize,
}

impl TokenBudget {
    pub fn new(ceiling: usize) -> Self {
        Self { ceiling, used: 0 }
    }

    /// Add `tokens` to the total. Returns `true` while the total is still
    /// within the ceiling.
    pub fn charge(&mut self, tokens: usize) -> bool {
        self.used = self.used.saturating_add(tokens);
        !self.exceeded()
    }

    pub fn exceeded(&self) -> bool {
        self.used > self.ceiling
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }
}

/// Iterator adapter that stops after the first item that exceeds the budget.
///
/// Items are `Result`s so rendering can stay lazy: an `Err` is passed through
/// without being charged and the caller decides whether to keep going.
pub struct WithinBudget<I, F> {
    inner: I,
    cost: F,
    budget: TokenBudget,
    done: bool,
}

impl<I, F> WithinBudget<I, F> {
    pub fn new(inner: I, ceiling: usize, cost: F) -> Self {
        Self {
            inner,
            cost,
            budget: TokenBudget::new(ceiling),
            done: false,
        }
    }

    /// The budget state after the items yielded so far.
    pub fn budget(&self) -> TokenBudget {
        self.budget
    }
}

impl<I, F, T, E> Iterator for WithinBudget<I, F>
where
    I: Iterator<Item = Result<T, E>>,
    F: FnMut(&T) -> usize,
{
    type Item = Result<T, E>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = self.inner.next()?;
        if let Ok(value) = &item
            && !self.budget.charge((self.cost)(value))
        {
            self.done = true;
        }
        Some(item)
    }
}
