//! Local GGUF model inference through llama.cpp.

use std::num::NonZeroU32;
use std::path::Path;
use std::sync::Mutex;

use llama_cpp_2::context::params::LlamaContextParams;
use llama_cpp_2::llama_backend::LlamaBackend as LlamaRuntime;
use llama_cpp_2::llama_batch::LlamaBatch;
use llama_cpp_2::model::params::LlamaModelParams;
use llama_cpp_2::model::{AddBos, LlamaModel, Special};
use llama_cpp_2::token::data_array::LlamaTokenDataArray;
use log::{debug, info};

use crate::summarizer::backend::{BackendError, GenerationRequest, SummarizationBackend};
use crate::summarizer::prompt::build_prompt;

/// Fixed sampling seed keeps output reproducible for identical input.
const SAMPLING_SEED: u32 = 42;

struct LoadedModel {
    model: LlamaModel,
    runtime: LlamaRuntime,
    ctx_params: LlamaContextParams,
}

// SAFETY: LoadedModel is only reached through the Mutex in LlamaBackend, so
// contexts are created and driven by one thread at a time.
unsafe impl Send for LoadedModel {}

pub struct LlamaBackend {
    inner: Mutex<LoadedModel>,
    context_size: u32,
    max_input_chars: usize,
}

impl LlamaBackend {
    pub fn new(model_path: &Path, context_size: u32, max_input_chars: usize) -> Result<Self, BackendError> {
        info!("Initializing LLM backend...");
        let runtime = LlamaRuntime::init().map_err(|e| BackendError::Unavailable(e.to_string()))?;

        info!("Loading model from: {}", model_path.display());
        let model_params = LlamaModelParams::default();
        let model = LlamaModel::load_from_file(&runtime, model_path, &model_params)
            .map_err(|e| BackendError::Unavailable(format!("Failed to load model: {}", e)))?;

        let ctx_params = LlamaContextParams::default().with_n_ctx(NonZeroU32::new(context_size));

        Ok(Self {
            inner: Mutex::new(LoadedModel {
                model,
                runtime,
                ctx_params,
            }),
            context_size,
            max_input_chars,
        })
    }

    fn run(&self, prompt: &str, max_tokens: usize) -> Result<String, BackendError> {
        let loaded = self
            .inner
            .lock()
            .map_err(|_| BackendError::Inference("model mutex poisoned".to_string()))?;

        let mut ctx = loaded
            .model
            .new_context(&loaded.runtime, loaded.ctx_params.clone())
            .map_err(|e| BackendError::Inference(format!("Failed to create context: {}", e)))?;

        let tokens = loaded
            .model
            .str_to_token(prompt, AddBos::Always)
            .map_err(|e| BackendError::Inference(format!("Failed to tokenize: {}", e)))?;

        let n_tokens = tokens.len();
        if n_tokens + max_tokens > self.context_size as usize {
            return Err(BackendError::Inference(format!(
                "prompt of {} tokens does not fit a {} token context",
                n_tokens, self.context_size
            )));
        }
        debug!("Tokenized prompt into {} tokens", n_tokens);

        let mut batch = LlamaBatch::new(self.context_size as usize, 1);
        for (i, token) in tokens.iter().enumerate() {
            let is_last = i == n_tokens - 1;
            batch
                .add(*token, i as i32, &[0], is_last)
                .map_err(|e| BackendError::Inference(format!("Failed to add token: {}", e)))?;
        }

        ctx.decode(&mut batch)
            .map_err(|e| BackendError::Inference(format!("Failed to decode prompt: {}", e)))?;

        let mut output = String::new();
        let mut n_cur = n_tokens;

        for _ in 0..max_tokens {
            let candidates = ctx.candidates_ith(batch.n_tokens() - 1);
            let mut candidates_array = LlamaTokenDataArray::from_iter(candidates, false);
            let new_token = candidates_array.sample_token(SAMPLING_SEED);

            if loaded.model.is_eog_token(new_token) {
                break;
            }

            let piece = loaded
                .model
                .token_to_str(new_token, Special::Tokenize)
                .map_err(|e| BackendError::Inference(format!("Failed to decode token: {}", e)))?;
            output.push_str(&piece);

            if output.contains("<|im_end|>") {
                break;
            }

            batch.clear();
            batch
                .add(new_token, n_cur as i32, &[0], true)
                .map_err(|e| BackendError::Inference(format!("Failed to add token: {}", e)))?;
            ctx.decode(&mut batch)
                .map_err(|e| BackendError::Inference(format!("Failed to decode: {}", e)))?;

            n_cur += 1;
        }

        Ok(output.replace("<|im_end|>", "").trim().to_string())
    }
}

impl SummarizationBackend for LlamaBackend {
    fn name(&self) -> &str {
        "llama"
    }

    fn max_input_chars(&self) -> usize {
        self.max_input_chars
    }

    fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, BackendError> {
        let _span = tracing::info_span!("summarizer.llama", style = request.style.as_str()).entered();
        let prompt = build_prompt(request);
        self.run(&prompt, request.max_tokens * 2)
    }
}
