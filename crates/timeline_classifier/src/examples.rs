//! Labeled relay lines and nearest-example lookup.

use anyhow::{bail, Context, Result};

use crate::ai::EmbeddingModel;

#[derive(Debug, Clone, PartialEq)]
pub struct LabeledExample {
    /// `[<clock>]<description>`
    pub input:  String,
    /// Expected structured answer, as JSON text.
    pub output: String,
}

impl LabeledExample {
    pub fn new(input: &str, output: &str) -> Self {
        Self {
            input:  input.to_string(),
            output: output.trim().to_string(),
        }
    }
}

/// Worked demonstrations covering the shapes the classifier has to emit.
pub fn default_examples() -> Vec<LabeledExample> {
    vec![
        LabeledExample::new(
            "[HT]경기가 종료되었습니다.",
            r#"{"team": "none", "desc": "경기가 종료되었습니다."}"#,
        ),
        LabeledExample::new(
            "[+7']아스날, 자기 진영에서의 프리킥.",
            r#"{"team": "away", "time": "+7'", "desc": "아스톤 빌라, 자기 진영에서 프리킥 기회를 얻었습니다."}"#,
        ),
        LabeledExample::new(
            "[+6']데이빗 쿠트 주심, 아스톤 빌라 에게 프리킥 판정.",
            r#"{"team": "away", "time": "+6'", "desc": "데이빗 쿠트 주심, 아스톤 빌라 에게 프리킥 판정."}"#,
        ),
        LabeledExample::new(
            "[+5']아스날, 데클런 라이스의 슛이 나오지만 빗나갑니다.",
            r#"{"team": "home", "time": "+5'", "desc": "아스날, 데클런 라이스의 슛이 나오지만 빗나갑니다."}"#,
        ),
        LabeledExample::new(
            "[+4']데이빗 쿠트 주심, 아스톤 빌라의 레온 베일리에게 오프사이드 판정을 내립니다.",
            r#"{"team": "away", "time": "+4'", "desc": "데이빗 쿠트 주심, 아스톤 빌라의 레온 베일리에게 오프사이드 판정을 내립니다."}"#,
        ),
        LabeledExample::new(
            "[+3']아스톤 빌라, 자기 진영에서의 프리킥.",
            r#"{"team": "away", "time": "+3'", "desc": "아스톤 빌라, 자기 진영에서의 프리킥."}"#,
        ),
        LabeledExample::new(
            "[+1']후반전 추가 시간은 8분 입니다.",
            r#"{"team": "none", "time": "+1'", "desc": "후반전 추가 시간은 8분 입니다."}"#,
        ),
        LabeledExample::new(
            "[87']아스날, 올렉산드르 진첸코 빼고 에드워드 은케티아투입합니다. 다섯번째 선수교체.",
            r#"{"team": "home", "time": "87'", "in": "은케티아", "out": "진첸코", "name": "은케티아 투입", "desc": "아스날, 올렉산드르 진첸코 빼고 에드워드 은케티아투입합니다. 다섯번째 선수교체."}"#,
        ),
        LabeledExample::new(
            "[87']유리 틸레만스의 도움으로 기록됩니다.",
            r#"{"team": "away", "time": "87'", "name": "유리 틸레만스 도움", "desc": "유리 틸레만스의 도움으로 기록됩니다."}"#,
        ),
        LabeledExample::new(
            "[87']골! 올리 왓킨스의 골로 아스톤 빌라 , 0-2까지 점수차를 벌립니다.",
            r#"{"team": "away", "time": "87'", "name": "올리 왓킨스", "desc": "골! 올리 왓킨스의 골로 아스톤 빌라 , 0-2까지 점수차를 벌립니다."}"#,
        ),
        LabeledExample::new(
            "[84']아스톤 빌라의 코너킥을 선언하는 데이빗 쿠트 주심.",
            r#"{"team": "away", "time": "84'", "desc": "아스톤 빌라의 코너킥을 선언하는 데이빗 쿠트 주심."}"#,
        ),
        LabeledExample::new(
            "[80']우나이 에메리(아스톤 빌라) 감독의 두 번째 선수 교체. 로페라 알렉스 모레노, 부상당한 니콜로 자니올로 대신 들어갑니다.",
            r#"{"team": "away", "time": "80'", "in": "알렉스 모레노", "out": "니콜로 자니올로", "name": "알렉스 모레노 투입", "desc": "우나이 에메리(아스톤 빌라) 감독의 두 번째 선수 교체. 로페라 알렉스 모레노, 부상당한 니콜로 자니올로 대신 들어갑니다."}"#,
        ),
        LabeledExample::new(
            "[79']아스날, 가브리에우 제주스대신 파비우 비에이라 들어갑니다. 네번째 선수교체.",
            r#"{"team": "home", "time": "79'", "in": "비에이라", "out": "가브리에우 제주스", "name": "비에이라 투입", "desc": "아스날, 가브리에우 제주스대신 파비우 비에이라 들어갑니다. 네번째 선수교체."}"#,
        ),
        LabeledExample::new(
            "[63']아스날의 카이 하베르츠, 경고를 받습니다.",
            r#"{"team": "home", "time": "63'", "name": "하베르츠 경고", "desc": "아스날의 카이 하베르츠, 경고를 받습니다."}"#,
        ),
        LabeledExample::new(
            "[+1']아스날의 가브리에우 마갈량이스, 런던에서 경고를 받습니다.",
            r#"{"team": "home", "time": "+1'", "name": "마갈량이스 경고", "desc": "아스날의 가브리에우 마갈량이스, 런던에서 경고를 받습니다."}"#,
        ),
        LabeledExample::new(
            "[63']아스톤 빌라의 모건 로저스, 경고입니다.",
            r#"{"team": "away", "time": "63'", "name": "로저스 경고", "desc": "아스톤 빌라의 모건 로저스, 경고입니다."}"#,
        ),
    ]
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// k=1 semantic lookup over a fixed example set. Example vectors are computed once.
pub struct ExampleSelector {
    examples: Vec<LabeledExample>,
    vectors:  Vec<Vec<f32>>,
}

impl ExampleSelector {
    pub async fn from_examples<E: EmbeddingModel>(
        examples: Vec<LabeledExample>,
        embedder: &E,
    ) -> Result<Self> {
        if examples.is_empty() {
            bail!("example set is empty");
        }

        let inputs: Vec<String> = examples.iter().map(|e| e.input.clone()).collect();
        let vectors = embedder
            .embed(&inputs)
            .await
            .context("Failed to embed example set")?;

        if vectors.len() != examples.len() {
            bail!("got {} example vectors for {} examples", vectors.len(), examples.len());
        }

        Ok(Self { examples, vectors })
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    /// Most similar example to an already embedded query; ties keep the earlier example.
    pub fn nearest(&self, query: &[f32]) -> &LabeledExample {
        let mut best = 0;
        let mut best_score = f32::MIN;
        for (i, v) in self.vectors.iter().enumerate() {
            let score = cosine_similarity(query, v);
            if score > best_score {
                best = i;
                best_score = score;
            }
        }
        &self.examples[best]
    }

    pub async fn select<E: EmbeddingModel>(&self, query: &str, embedder: &E) -> Result<&LabeledExample> {
        let vectors = embedder.embed(&[query.to_string()]).await?;
        let query_vec = vectors
            .first()
            .context("embedding service returned no vector for query")?;
        Ok(self.nearest(query_vec))
    }
}
