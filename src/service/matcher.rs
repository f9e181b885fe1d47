use std::cmp::Ordering;
use std::collections::HashSet;

use bigdecimal::{BigDecimal, Zero};
use rayon::prelude::*;

use crate::config::MatchingConfig;
use crate::error::ReconcileError;
use crate::models::{
    Channel, LedgerEntry, MatchCandidatePool, NormalizedEntry, PoolSlot, ReconcileStats,
    ReconciledPair, Reconciliation,
};
use crate::service::normalizer::{NameNormalizer, UNRESOLVED_IDENTITY};
use crate::service::similarity::{identity_similarity, SimilarityMetric};

/// 某条借方记录的候选贷方
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// 贷方池中的槽位
    pub slot: usize,
    pub similarity: f64,
    pub difference: BigDecimal,
}

/// 候选比较：`Greater` 表示 challenger 严格优于 incumbent
///
/// 1. 相似度高者优先
/// 2. 相似度相同时金额差小者优先
///
/// 两项都相同返回 `Equal`，调用方保留先遇到的候选。
pub fn compare_candidates(challenger: &Candidate, incumbent: &Candidate) -> Ordering {
    challenger
        .similarity
        .total_cmp(&incumbent.similarity)
        .then_with(|| incumbent.difference.cmp(&challenger.difference))
}

/// 对账服务：借贷双方单轮贪心配对
///
/// 借方按金额升序逐条处理，每条借方在尚未占用的贷方中挑选最优候选；
/// 贷方一旦被占用就不会再让给后面的借方，即使后者匹配得更好。
/// 最坏复杂度 O(借方数 × 贷方数)。
#[derive(Debug, Clone)]
pub struct Reconciler {
    normalizer: NameNormalizer,
    metric: SimilarityMetric,
    parallel: bool,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self {
            normalizer: NameNormalizer::default(),
            metric: SimilarityMetric::default(),
            parallel: false,
        }
    }
}

impl Reconciler {
    pub fn new(config: &MatchingConfig) -> Result<Self, ReconcileError> {
        Ok(Self {
            normalizer: NameNormalizer::new(&config.normalizer)?,
            metric: config.metric,
            parallel: config.parallel,
        })
    }

    pub fn with_metric(mut self, metric: SimilarityMetric) -> Self {
        self.metric = metric;
        self
    }

    /// 并行计算候选评分；占用仍串行进行，结果与串行版本一致
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// 执行一次对账
    ///
    /// 返回的配对与残余互不相交，合起来恰好覆盖每条输入记录一次。
    pub fn reconcile(
        &self,
        entries: &[LedgerEntry],
        tolerance: &BigDecimal,
        similarity_threshold: f64,
    ) -> Result<Reconciliation, ReconcileError> {
        validate(entries, tolerance, similarity_threshold)?;

        // Phase 1: 归一化 + 分池
        let normalized: Vec<NormalizedEntry<'_>> = entries
            .iter()
            .map(|entry| NormalizedEntry {
                entry,
                identity: self.normalizer.normalize(&entry.description),
            })
            .collect();

        let mut debits = MatchCandidatePool::build(Channel::Debit, &normalized);
        let mut credits = MatchCandidatePool::build(Channel::Credit, &normalized);

        tracing::info!(
            "[Reconcile] 开始对账: {} 条记录, 借方 {} 条, 贷方 {} 条, 容差 {}, 相似度阈值 {}",
            entries.len(),
            debits.len(),
            credits.len(),
            tolerance,
            similarity_threshold
        );

        // Phase 2: 贪心配对
        let scorer = PairScorer {
            normalized: &normalized,
            metric: self.metric,
            tolerance,
            threshold: similarity_threshold,
        };
        let pairs = if debits.is_empty() || credits.is_empty() {
            tracing::info!("[Reconcile] 借方或贷方为空，跳过配对");
            Vec::new()
        } else if self.parallel {
            match_parallel(&scorer, &mut debits, &mut credits)
        } else {
            match_sequential(&scorer, &mut debits, &mut credits)
        };

        // Phase 3: 残余 = 未被任何配对占用的记录
        let consumed: HashSet<usize> = debits
            .consumed_indices()
            .chain(credits.consumed_indices())
            .collect();
        let residue: Vec<LedgerEntry> = entries
            .iter()
            .enumerate()
            .filter(|(i, _)| !consumed.contains(i))
            .map(|(_, e)| e.clone())
            .collect();

        debug_assert_eq!(pairs.len() * 2 + residue.len(), entries.len());

        let stats = ReconcileStats {
            total_entries: entries.len(),
            debit_entries: debits.len(),
            credit_entries: credits.len(),
            matched_pairs: pairs.len(),
            residue_entries: residue.len(),
            matched_debit_total: pairs.iter().map(|p| &p.debit_amount).sum(),
            matched_credit_total: pairs.iter().map(|p| &p.credit_amount).sum(),
        };

        tracing::info!(
            "[Reconcile] 对账完成: 配对 {} 组, 残余 {} 条",
            stats.matched_pairs,
            stats.residue_entries
        );

        Ok(Reconciliation {
            pairs,
            residue,
            stats,
        })
    }
}

/// 使用默认归一化配置与相似度算法对账
pub fn reconcile(
    entries: &[LedgerEntry],
    tolerance: &BigDecimal,
    similarity_threshold: f64,
) -> Result<Reconciliation, ReconcileError> {
    Reconciler::default().reconcile(entries, tolerance, similarity_threshold)
}

/// 结构校验：不合法的输入拒绝执行，而不是产出部分错误的结果
fn validate(
    entries: &[LedgerEntry],
    tolerance: &BigDecimal,
    similarity_threshold: f64,
) -> Result<(), ReconcileError> {
    if *tolerance < BigDecimal::zero() {
        return Err(ReconcileError::InvalidTolerance(tolerance.clone()));
    }
    if !(0.0..=1.0).contains(&similarity_threshold) {
        return Err(ReconcileError::InvalidThreshold(similarity_threshold));
    }

    let mut seen = HashSet::with_capacity(entries.len());
    for e in entries {
        if !seen.insert(e.id) {
            return Err(ReconcileError::DuplicateId(e.id));
        }
        if !e.debit.is_zero() && !e.credit.is_zero() {
            return Err(ReconcileError::ConflictingAmounts {
                id: e.id,
                debit: e.debit.clone(),
                credit: e.credit.clone(),
            });
        }
    }
    Ok(())
}

/// 单轮对账中不变的评分上下文
struct PairScorer<'r, 'a> {
    normalized: &'r [NormalizedEntry<'a>],
    metric: SimilarityMetric,
    tolerance: &'r BigDecimal,
    threshold: f64,
}

impl PairScorer<'_, '_> {
    /// 金额超出容差、身份未确定、相似度低于阈值的组合都不是候选
    fn evaluate(&self, debit: &PoolSlot, slot: usize, credit: &PoolSlot) -> Option<Candidate> {
        let difference = (&debit.amount - &credit.amount).abs();
        if difference > *self.tolerance {
            return None;
        }

        let debit_identity = &self.normalized[debit.index].identity;
        let credit_identity = &self.normalized[credit.index].identity;
        if debit_identity == UNRESOLVED_IDENTITY || credit_identity == UNRESOLVED_IDENTITY {
            return None;
        }

        let similarity = identity_similarity(self.metric, debit_identity, credit_identity);
        if similarity < self.threshold {
            return None;
        }

        Some(Candidate {
            slot,
            similarity,
            difference,
        })
    }

    fn pair(&self, debit: &PoolSlot, credit: &PoolSlot, best: Candidate) -> ReconciledPair {
        let d = self.normalized[debit.index].entry;
        let c = self.normalized[credit.index].entry;
        tracing::debug!(
            "配对: 借方 #{} {} <-> 贷方 #{} {}, 差额 {}, 相似度 {:.3}",
            d.id,
            d.debit,
            c.id,
            c.credit,
            best.difference,
            best.similarity
        );
        ReconciledPair {
            debit_id: d.id,
            debit_date: d.date,
            debit_description: d.description.clone(),
            debit_amount: d.debit.clone(),
            credit_id: c.id,
            credit_date: c.date,
            credit_description: c.description.clone(),
            credit_amount: c.credit.clone(),
            difference: best.difference,
            similarity: best.similarity,
        }
    }
}

fn match_sequential(
    scorer: &PairScorer<'_, '_>,
    debits: &mut MatchCandidatePool,
    credits: &mut MatchCandidatePool,
) -> Vec<ReconciledPair> {
    let mut pairs = Vec::new();

    for d in 0..debits.len() {
        if !debits.is_available(d) {
            continue;
        }
        let debit = &debits.slots()[d];

        let mut best: Option<Candidate> = None;
        for (c, credit) in credits.slots().iter().enumerate() {
            if !credits.is_available(c) {
                continue;
            }
            let Some(candidate) = scorer.evaluate(debit, c, credit) else {
                continue;
            };
            let better = match &best {
                None => true,
                Some(incumbent) => compare_candidates(&candidate, incumbent) == Ordering::Greater,
            };
            if better {
                best = Some(candidate);
            }
        }

        if let Some(best) = best {
            let pair = scorer.pair(debit, &credits.slots()[best.slot], best.clone());
            debits.claim(d);
            credits.claim(best.slot);
            pairs.push(pair);
        }
    }

    pairs
}

/// 候选列表并行计算，按优先级稳定排序后串行认领
///
/// 每条借方取列表中第一个尚未占用的贷方，与串行扫描得到的最优候选相同。
fn match_parallel(
    scorer: &PairScorer<'_, '_>,
    debits: &mut MatchCandidatePool,
    credits: &mut MatchCandidatePool,
) -> Vec<ReconciledPair> {
    let credit_slots = credits.slots();
    let ranked: Vec<Vec<Candidate>> = debits
        .slots()
        .par_iter()
        .map(|debit| {
            let mut candidates: Vec<Candidate> = credit_slots
                .iter()
                .enumerate()
                .filter_map(|(c, credit)| scorer.evaluate(debit, c, credit))
                .collect();
            candidates.sort_by(|a, b| compare_candidates(b, a));
            candidates
        })
        .collect();

    let mut pairs = Vec::new();
    for (d, candidates) in ranked.into_iter().enumerate() {
        if !debits.is_available(d) {
            continue;
        }
        let Some(best) = candidates.into_iter().find(|c| credits.is_available(c.slot)) else {
            continue;
        };
        if !credits.claim(best.slot) {
            continue;
        }
        debits.claim(d);
        let pair = scorer.pair(&debits.slots()[d], &credits.slots()[best.slot], best);
        pairs.push(pair);
    }

    pairs
}
