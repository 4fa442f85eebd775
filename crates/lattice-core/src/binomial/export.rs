use serde::{Deserialize, Serialize};

use super::induction::ValueGrid;
use super::lattice::Lattice;
use super::parameters::DerivedParameters;
use crate::types::{Money, OptionType, OutputMode};

// ---------------------------------------------------------------------------
// Exported data
// ---------------------------------------------------------------------------

/// One lattice node as handed to a renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub layer: u32,
    pub up_count: u32,
    pub asset_price: Money,
    pub option_value: Money,
}

/// A finished pricing run: parameters, the full lattice and its values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Valuation {
    pub option_type: OptionType,
    pub derived: DerivedParameters,
    pub lattice: Lattice,
    pub values: ValueGrid,
    pub price: Money,
}

impl Valuation {
    /// Every node, by layer and then by up count.
    pub fn nodes(&self) -> impl Iterator<Item = NodeRecord> + '_ {
        self.lattice
            .rows()
            .zip((0..self.values.layers()).map(move |i| self.values.row(i)))
            .enumerate()
            .flat_map(|(layer, (prices, values))| {
                prices
                    .iter()
                    .zip(values)
                    .enumerate()
                    .map(move |(up_count, (&asset_price, &option_value))| NodeRecord {
                        layer: layer as u32,
                        up_count: up_count as u32,
                        asset_price,
                        option_value,
                    })
            })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceOutput {
    pub price: Money,
    pub option_type: OptionType,
    pub steps: u32,
    pub derived: DerivedParameters,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatticeOutput {
    pub price: Money,
    pub option_type: OptionType,
    pub steps: u32,
    pub derived: DerivedParameters,
    pub nodes: Vec<NodeRecord>,
}

// ---------------------------------------------------------------------------
// Consumers
// ---------------------------------------------------------------------------

/// Downstream recipient of a pricing run.
///
/// The pipeline reads [`mode`](ResultConsumer::mode) once, before any lattice
/// work. Graphical consumers then receive every node, layer by layer, and
/// all consumers finish with the root price summary.
pub trait ResultConsumer {
    type Output: Serialize;

    fn mode(&self) -> OutputMode;

    fn accept_node(&mut self, _node: NodeRecord) {}

    fn finish(self, summary: PriceOutput) -> Self::Output;
}

/// Console-report variant: keeps only the root price.
#[derive(Debug, Default)]
pub struct PriceReport;

impl PriceReport {
    pub fn new() -> Self {
        Self
    }
}

impl ResultConsumer for PriceReport {
    type Output = PriceOutput;

    fn mode(&self) -> OutputMode {
        OutputMode::Numeric
    }

    fn finish(self, summary: PriceOutput) -> PriceOutput {
        summary
    }
}

/// Render-lattice variant: the root price plus one record per node.
#[derive(Debug, Default)]
pub struct LatticeRender {
    nodes: Vec<NodeRecord>,
}

impl LatticeRender {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResultConsumer for LatticeRender {
    type Output = LatticeOutput;

    fn mode(&self) -> OutputMode {
        OutputMode::Graphical
    }

    fn accept_node(&mut self, node: NodeRecord) {
        self.nodes.push(node);
    }

    fn finish(self, summary: PriceOutput) -> LatticeOutput {
        LatticeOutput {
            price: summary.price,
            option_type: summary.option_type,
            steps: summary.steps,
            derived: summary.derived,
            nodes: self.nodes,
        }
    }
}

pub(crate) fn summarize(
    option_type: OptionType,
    derived: &DerivedParameters,
    price: Money,
) -> PriceOutput {
    PriceOutput {
        price,
        option_type,
        steps: derived.steps,
        derived: derived.clone(),
    }
}

/// Feed every node of a finished valuation to the consumer and close it.
pub fn export<C: ResultConsumer>(mut consumer: C, valuation: &Valuation) -> C::Output {
    for node in valuation.nodes() {
        consumer.accept_node(node);
    }
    consumer.finish(summarize(
        valuation.option_type,
        &valuation.derived,
        valuation.price,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binomial::pricing::value_option;
    use crate::binomial::parameters::{MarketParameters, PricingConfig};
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn config(steps: u32) -> PricingConfig {
        PricingConfig::new(
            MarketParameters {
                spot: dec!(100),
                strike: dec!(100),
                risk_free_rate: dec!(0.05),
                steps,
                maturity: dec!(1),
                volatility: dec!(0.20),
            },
            OptionType::Call,
            OutputMode::Graphical,
        )
    }

    #[test]
    fn test_one_record_per_node() {
        let valuation = value_option(&config(4)).unwrap().result;
        let nodes: Vec<NodeRecord> = valuation.nodes().collect();
        assert_eq!(nodes.len(), 15);
        assert_eq!((nodes[0].layer, nodes[0].up_count), (0, 0));
        assert_eq!((nodes[14].layer, nodes[14].up_count), (4, 4));
    }

    #[test]
    fn test_records_match_lattice_and_grid() {
        let valuation = value_option(&config(3)).unwrap().result;
        for node in valuation.nodes() {
            let (i, j) = (node.layer as usize, node.up_count as usize);
            assert_eq!(Some(node.asset_price), valuation.lattice.price(i, j));
            assert_eq!(Some(node.option_value), valuation.values.value(i, j));
        }
    }

    #[test]
    fn test_root_record_carries_price() {
        let valuation = value_option(&config(2)).unwrap().result;
        let root = valuation.nodes().next().unwrap();
        assert_eq!(root.asset_price, dec!(100));
        assert_eq!(root.option_value, valuation.price);
    }

    #[test]
    fn test_render_consumer_collects_everything() {
        let valuation = value_option(&config(5)).unwrap().result;
        let out = export(LatticeRender::new(), &valuation);
        assert_eq!(out.nodes.len(), 21);
        assert_eq!(out.price, valuation.price);
        assert_eq!(out.steps, 5);
    }

    #[test]
    fn test_report_consumer_ignores_nodes() {
        let valuation = value_option(&config(5)).unwrap().result;
        let out = export(PriceReport::new(), &valuation);
        assert_eq!(out.price, valuation.price);
        assert_eq!(out.derived, valuation.derived);
    }
}
