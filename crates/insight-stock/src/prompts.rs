//! Prompt templates for model-backed ranking
//!
//! Templates are MiniJinja strings kept in both supported languages; the
//! configured [`Language`] picks one at render time.

use crate::config::Language;
use crate::error::Result;
use minijinja::Environment;
use serde::Serialize;

/// A named template with an English and a Traditional Chinese variant
#[derive(Debug, Clone, Copy)]
pub struct BilingualTemplate {
    name: &'static str,
    english: &'static str,
    traditional_chinese: &'static str,
}

impl BilingualTemplate {
    /// Template name, used in render errors
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Raw template source for `language`
    pub fn source(&self, language: Language) -> &'static str {
        match language {
            Language::English => self.english,
            Language::TraditionalChinese => self.traditional_chinese,
        }
    }

    /// Render the variant for `language` with `vars`
    pub fn render<S: Serialize>(&self, language: Language, vars: S) -> Result<String> {
        let mut env = Environment::new();
        env.add_template(self.name, self.source(language))?;
        let template = env.get_template(self.name)?;
        Ok(template.render(vars)?)
    }
}

/// System prompt for picking one candidate out of a digest
pub const ANALYZER_SYSTEM: BilingualTemplate = BilingualTemplate {
    name: "ranking.system",
    english: "You are an expert investment analyst. Your task is to analyze
stock candidates and select the single best one for an investment post.

Focus on:
1. Is the stock undervalued or overvalued vs consensus?
2. Has negative news been over-reacted to, or positive news not yet priced in?
3. Does the company have a long-term structural moat (data, scale, AI, essential demand)?

Select stocks where market sentiment severely disconnects from fundamentals.
Prefer defensive sector leaders or AI-related transformation plays after major drops.",
    traditional_chinese: "你是一位專業投資分析師。你的任務是分析股票候選人並選出最適合投資文章的標的。

重點關注：
1. 該股票相對於市場共識是被低估還是高估？
2. 負面消息是否被過度反應，或正面消息尚未反映在價格中？
3. 該公司是否具有長期結構性護城河（數據、規模、AI、必需性需求）？

選擇市場情緒與基本面嚴重脫節的股票。
優先考慮防禦性行業龍頭或大跌後的AI轉型題材。",
};

/// User prompt carrying the numbered candidate digest as `digest`
pub const ANALYZER_USER: BilingualTemplate = BilingualTemplate {
    name: "ranking.user",
    english: "Analyze these stock candidates and select the TOP 1 most compelling for an investment post:

{{ digest }}

Respond with:
1. Your selected ticker
2. Brief reasoning (2-3 sentences)
3. Key investment thesis angle",
    traditional_chinese: "分析這些股票候選人並選出最適合投資文章的標的：

{{ digest }}

請回覆：
1. 你選擇的股票代碼
2. 簡要理由（2-3句）
3. 核心投資論點角度",
};

#[derive(Serialize)]
struct RankingVars<'a> {
    digest: &'a str,
}

/// Render the (system, user) prompt pair for a candidate digest
pub fn ranking_prompts(language: Language, digest: &str) -> Result<(String, String)> {
    let system = ANALYZER_SYSTEM.render(language, ())?;
    let user = ANALYZER_USER.render(language, RankingVars { digest })?;
    Ok((system, user))
}
