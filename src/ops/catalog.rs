use crate::ops::{AggFn, BinaryFn, CorrectionLocation, Direction};
use std::collections::HashMap;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy)]
pub struct BinaryMeta {
    /// Instruction token, e.g. `>=`.
    pub token: &'static str,
    pub func: BinaryFn,
}

#[derive(Debug, Clone, Copy)]
pub struct UaggMeta {
    /// Instruction token, e.g. `uark+`.
    pub token: &'static str,
    pub agg: AggFn,
    pub direction: Direction,
    /// Where the accumulation keeps its auxiliary values.
    pub correction: CorrectionLocation,
}

const fn bin(token: &'static str, func: BinaryFn) -> BinaryMeta {
    BinaryMeta { token, func }
}

const fn uagg(
    token: &'static str,
    agg: AggFn,
    direction: Direction,
    correction: CorrectionLocation,
) -> UaggMeta {
    UaggMeta {
        token,
        agg,
        direction,
        correction,
    }
}

static BINARY_METAS: &[BinaryMeta] = &[
    bin("+", BinaryFn::Plus),
    bin("-", BinaryFn::Minus),
    bin("*", BinaryFn::Multiply),
    bin("/", BinaryFn::Divide),
    bin("^", BinaryFn::Power),
    bin("%%", BinaryFn::Modulus),
    bin("%/%", BinaryFn::IntDiv),
    bin("min", BinaryFn::Min),
    bin("max", BinaryFn::Max),
    bin("<", BinaryFn::LessThan),
    bin("<=", BinaryFn::LessThanEquals),
    bin(">", BinaryFn::GreaterThan),
    bin(">=", BinaryFn::GreaterThanEquals),
    bin("==", BinaryFn::Equals),
    bin("!=", BinaryFn::NotEquals),
    bin("&&", BinaryFn::And),
    bin("||", BinaryFn::Or),
];

static UAGG_METAS: &[UaggMeta] = &[
    uagg("uak+", AggFn::Sum, Direction::All, CorrectionLocation::LastColumn),
    uagg("uark+", AggFn::Sum, Direction::ToColumn, CorrectionLocation::LastColumn),
    uagg("uack+", AggFn::Sum, Direction::ToRow, CorrectionLocation::LastRow),
    uagg("uasqk+", AggFn::SumSq, Direction::All, CorrectionLocation::LastColumn),
    uagg("uarsqk+", AggFn::SumSq, Direction::ToColumn, CorrectionLocation::LastColumn),
    uagg("uacsqk+", AggFn::SumSq, Direction::ToRow, CorrectionLocation::LastRow),
    uagg("uamean", AggFn::Mean, Direction::All, CorrectionLocation::LastTwoColumns),
    uagg("uarmean", AggFn::Mean, Direction::ToColumn, CorrectionLocation::LastTwoColumns),
    uagg("uacmean", AggFn::Mean, Direction::ToRow, CorrectionLocation::LastTwoRows),
    uagg("uamax", AggFn::Max, Direction::All, CorrectionLocation::None),
    uagg("uarmax", AggFn::Max, Direction::ToColumn, CorrectionLocation::None),
    uagg("uacmax", AggFn::Max, Direction::ToRow, CorrectionLocation::None),
    uagg("uamin", AggFn::Min, Direction::All, CorrectionLocation::None),
    uagg("uarmin", AggFn::Min, Direction::ToColumn, CorrectionLocation::None),
    uagg("uacmin", AggFn::Min, Direction::ToRow, CorrectionLocation::None),
    uagg("uarimax", AggFn::MaxIndex, Direction::ToColumn, CorrectionLocation::LastColumn),
    uagg("uarimin", AggFn::MinIndex, Direction::ToColumn, CorrectionLocation::LastColumn),
];

pub struct OperatorCatalog;

impl OperatorCatalog {
    pub fn binary(token: &str) -> Option<&'static BinaryMeta> {
        let index = CATALOG_INDEX.get_or_init(build_catalog_index);
        index.binary_by_token.get(token).map(|idx| &BINARY_METAS[*idx])
    }

    pub fn binary_by_fn(func: BinaryFn) -> &'static BinaryMeta {
        let index = CATALOG_INDEX.get_or_init(build_catalog_index);
        &BINARY_METAS[index.binary_by_fn[func.as_usize()]]
    }

    /// Unary-aggregate tokens are matched case-insensitively.
    pub fn uagg(token: &str) -> Option<&'static UaggMeta> {
        let index = CATALOG_INDEX.get_or_init(build_catalog_index);
        index
            .uagg_by_token
            .get(token.to_ascii_lowercase().as_str())
            .map(|idx| &UAGG_METAS[*idx])
    }

    pub fn uagg_for(agg: AggFn, direction: Direction) -> Option<&'static UaggMeta> {
        UAGG_METAS
            .iter()
            .find(|meta| meta.agg == agg && meta.direction == direction)
    }

    pub fn binary_metas() -> &'static [BinaryMeta] {
        BINARY_METAS
    }

    pub fn uagg_metas() -> &'static [UaggMeta] {
        UAGG_METAS
    }
}

struct CatalogIndex {
    binary_by_token: HashMap<&'static str, usize>,
    binary_by_fn: [usize; BinaryFn::COUNT],
    uagg_by_token: HashMap<&'static str, usize>,
}

static CATALOG_INDEX: OnceLock<CatalogIndex> = OnceLock::new();
const MISSING_IDX: usize = usize::MAX;

fn build_catalog_index() -> CatalogIndex {
    let mut binary_by_token = HashMap::with_capacity(BINARY_METAS.len());
    let mut binary_by_fn = [MISSING_IDX; BinaryFn::COUNT];
    for (idx, meta) in BINARY_METAS.iter().enumerate() {
        if binary_by_token.insert(meta.token, idx).is_some() {
            panic!("duplicate binary operator token in catalog: {}", meta.token);
        }
        let slot = meta.func.as_usize();
        if binary_by_fn[slot] != MISSING_IDX {
            panic!("duplicate binary function in catalog: {:?}", meta.func);
        }
        binary_by_fn[slot] = idx;
    }
    for (slot, idx) in binary_by_fn.iter().enumerate() {
        if *idx == MISSING_IDX {
            panic!("binary function slot not registered: {}", slot);
        }
    }

    let mut uagg_by_token = HashMap::with_capacity(UAGG_METAS.len());
    for (idx, meta) in UAGG_METAS.iter().enumerate() {
        validate_uagg_meta(meta);
        if uagg_by_token.insert(meta.token, idx).is_some() {
            panic!("duplicate unary aggregate token in catalog: {}", meta.token);
        }
    }

    CatalogIndex {
        binary_by_token,
        binary_by_fn,
        uagg_by_token,
    }
}

fn validate_uagg_meta(meta: &UaggMeta) {
    if meta.token != meta.token.to_ascii_lowercase() {
        panic!("unary aggregate token `{}` must be lowercase", meta.token);
    }
    let expected_slots = match meta.agg {
        AggFn::Sum | AggFn::SumSq | AggFn::MaxIndex | AggFn::MinIndex => 1,
        AggFn::Mean => 2,
        AggFn::Max | AggFn::Min => 0,
    };
    if meta.correction.slots() != expected_slots {
        panic!(
            "unary aggregate `{}` needs {} correction slots, catalog declares {:?}",
            meta.token, expected_slots, meta.correction
        );
    }
    let rows_collapse = matches!(
        meta.correction,
        CorrectionLocation::LastRow | CorrectionLocation::LastTwoRows
    );
    // correction rows only fit a single-row result, correction columns a single-column one
    let fits = match meta.direction {
        Direction::ToRow => !meta.correction.exists() || rows_collapse,
        Direction::ToColumn | Direction::All => !rows_collapse,
    };
    if !fits {
        panic!(
            "unary aggregate `{}` places correction {:?} across its reduction direction {:?}",
            meta.token, meta.correction, meta.direction
        );
    }
    if matches!(meta.agg, AggFn::MaxIndex | AggFn::MinIndex)
        && meta.direction != Direction::ToColumn
    {
        panic!("index aggregate `{}` must reduce to a column", meta.token);
    }
}
