use proptest::prelude::*;

use wrdata::{AssetType, DataRequest, DataStream, RawSeries, WrdataError};

use crate::helpers::{AAPL, MockProvider, day, series};

const NAMES: [&str; 4] = ["p0", "p1", "p2", "p3"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Outcome {
    Rows,
    Empty,
    Fails,
}

fn arb_outcome() -> impl Strategy<Value = Outcome> {
    prop_oneof![Just(Outcome::Rows), Just(Outcome::Empty), Just(Outcome::Fails)]
}

fn arb_setup() -> impl Strategy<Value = (Vec<Outcome>, usize, bool)> {
    proptest::collection::vec(arb_outcome(), 1..=NAMES.len())
        .prop_flat_map(|outcomes| {
            let n = outcomes.len();
            (Just(outcomes), 0..n, any::<bool>())
        })
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn fallback_chain_matches_model((outcomes, primary, fallback) in arb_setup()) {
        tokio_test::block_on(async move {
            let providers: Vec<_> = outcomes
                .iter()
                .zip(NAMES)
                .map(|(o, name)| {
                    let b = MockProvider::builder().name(name);
                    let b = match o {
                        Outcome::Rows => b.returns_ok(series(&[(1_700_000_000, 1.0)])),
                        Outcome::Empty => b.returns_ok(RawSeries::default()),
                        Outcome::Fails => b.fails_with(WrdataError::provider(name, "down")),
                    };
                    b.build()
                })
                .collect();

            let mut builder = DataStream::builder()
                .priority_for(AssetType::Equity, &[NAMES[primary]]);
            for p in &providers {
                builder = builder.with_provider(p.clone());
            }
            let ds = builder.build().unwrap();

            let req = DataRequest::builder(AAPL)
                .start(day(2024, 1, 1))
                .end(day(2024, 1, 31))
                .fallback(fallback)
                .build()
                .unwrap();
            let resp = ds.fetch(&req).await;

            // Model: primary first, then everyone else in registration order.
            let mut order = vec![primary];
            if fallback {
                order.extend((0..outcomes.len()).filter(|&i| i != primary));
            }
            let winner = order.iter().position(|&i| outcomes[i] == Outcome::Rows);
            let tried = winner.map_or(order.len(), |w| w + 1);

            match winner {
                Some(w) => {
                    assert!(resp.success);
                    assert_eq!(resp.provider, NAMES[order[w]]);
                    assert_eq!(resp.data.len(), 1);
                }
                None => {
                    assert!(!resp.success);
                    assert!(resp.data.is_empty());
                    assert_eq!(resp.provider, NAMES[primary]);
                    if fallback {
                        assert_eq!(resp.error.as_deref(), Some("All providers failed to fetch data"));
                    }
                }
            }
            for (i, p) in providers.iter().enumerate() {
                let expected = usize::from(order[..tried].contains(&i));
                assert_eq!(p.calls(), expected, "calls to {}", NAMES[i]);
            }
        });
    }
}
