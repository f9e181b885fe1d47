use bigdecimal::{BigDecimal, Zero};

use super::NormalizedEntry;

/// 记账方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Debit,
    Credit,
}

impl Channel {
    /// 该方向上的金额
    pub fn amount<'e>(&self, entry: &'e NormalizedEntry<'_>) -> &'e BigDecimal {
        match self {
            Self::Debit => &entry.entry.debit,
            Self::Credit => &entry.entry.credit,
        }
    }
}

/// 槽位状态：一旦 Consumed 就不再参与匹配
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotStatus {
    Available,
    Consumed,
}

#[derive(Debug, Clone)]
pub struct PoolSlot {
    /// 在归一化记录列表中的下标
    pub index: usize,
    pub amount: BigDecimal,
    pub status: SlotStatus,
}

/// 候选池 - 单一方向上金额为正的记录，按金额升序
///
/// 排序是稳定的：金额相同的记录保持输入顺序。
#[derive(Debug, Clone)]
pub struct MatchCandidatePool {
    channel: Channel,
    slots: Vec<PoolSlot>,
}

impl MatchCandidatePool {
    pub fn build(channel: Channel, entries: &[NormalizedEntry<'_>]) -> Self {
        let mut slots: Vec<PoolSlot> = entries
            .iter()
            .enumerate()
            .filter_map(|(index, e)| {
                let amount = channel.amount(e);
                (*amount > BigDecimal::zero()).then(|| PoolSlot {
                    index,
                    amount: amount.clone(),
                    status: SlotStatus::Available,
                })
            })
            .collect();

        slots.sort_by(|a, b| a.amount.cmp(&b.amount));

        Self { channel, slots }
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn slots(&self) -> &[PoolSlot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_available(&self, slot: usize) -> bool {
        self.slots[slot].status == SlotStatus::Available
    }

    /// 占用槽位；已被占用时返回 false
    pub fn claim(&mut self, slot: usize) -> bool {
        let s = &mut self.slots[slot];
        if s.status == SlotStatus::Consumed {
            return false;
        }
        s.status = SlotStatus::Consumed;
        true
    }

    /// 已占用槽位对应的归一化记录下标
    pub fn consumed_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.slots
            .iter()
            .filter(|s| s.status == SlotStatus::Consumed)
            .map(|s| s.index)
    }
}
