//! Property tests for factor naming and derivation.

use chrono::{Days, NaiveDate};
use proptest::prelude::*;
use tasman_factors::{FactorConfig, FactorDeriver, FactorKey, FactorKind};
use tasman_data::{Panel, PanelColumn, PriceMatrix, ReturnComputer};

fn kind() -> impl Strategy<Value = FactorKind> {
    prop_oneof![Just(FactorKind::Momentum), Just(FactorKind::Volatility)]
}

proptest! {
    #[test]
    fn rendered_keys_parse_back(
        instrument in "[A-Z][A-Z0-9_.-]{0,8}",
        kind in kind(),
        horizon in 1usize..500,
    ) {
        let key = FactorKey::new(instrument, kind, horizon);
        prop_assert_eq!(FactorKey::parse(&key.render()), Some(key));
    }

    #[test]
    fn momentum_first_defined_after_horizon(
        prices in prop::collection::vec(1.0f64..100.0, 1..60),
        horizon in 1usize..20,
    ) {
        let start = NaiveDate::from_ymd_opt(2021, 3, 1).unwrap();
        let dates: Vec<NaiveDate> = (0..prices.len() as u64)
            .map(|d| start.checked_add_days(Days::new(d)).unwrap())
            .collect();
        let column = PanelColumn::new("X", prices.iter().copied().map(Some).collect());
        let matrix = PriceMatrix::new(Panel::new(dates.clone(), vec![column]).unwrap()).unwrap();
        let returns = ReturnComputer::new().compute(&matrix).unwrap();

        let config = FactorConfig {
            momentum_horizons: vec![horizon],
            volatility_windows: vec![2],
        };
        let table = FactorDeriver::new(config).unwrap().derive(&matrix, &returns).unwrap();
        let name = FactorKey::new("X", FactorKind::Momentum, horizon).render();

        for (row, date) in table.panel().dates().iter().enumerate() {
            let price_row = dates.binary_search(date).unwrap();
            prop_assert_eq!(table.panel().value(&name, row).is_some(), price_row >= horizon);
        }
    }
}
