use mungerline_core::{
    analyze, diagnose, BandThresholds, DiagnosisResult, NotApplicableReason, ProviderId,
    QuoteRecord, Sourced, Ticker, ValuationBand, ValueOrigin,
};

fn years(pe: f64, growth: f64, target: f64) -> f64 {
    diagnose(pe, growth, target)
        .years()
        .expect("inputs should be in the model's domain")
}

#[test]
fn expensive_growth_stock_needs_about_three_years() {
    let result = diagnose(30.0, 0.15, 20.0);
    let years = result.years().expect("years to regress");

    assert!((years - 2.901).abs() < 0.01, "got {years}");
    assert_eq!(BandThresholds::default().classify(&result), Some(ValuationBand::HighlyAttractive));
}

#[test]
fn falling_earnings_are_not_applicable() {
    assert_eq!(
        diagnose(15.0, -0.05, 20.0),
        DiagnosisResult::NotApplicable {
            reason: NotApplicableReason::NonPositiveGrowth
        }
    );
}

#[test]
fn at_or_below_target_is_already_attractive() {
    for pe in [5.0, 19.99, 20.0] {
        assert_eq!(diagnose(pe, 0.10, 20.0), DiagnosisResult::AlreadyAttractive);
    }
}

#[test]
fn invalid_inputs_never_produce_years() {
    let cases = [
        (f64::NAN, 0.1, 20.0, NotApplicableReason::PeInvalid),
        (-12.0, 0.1, 20.0, NotApplicableReason::PeInvalid),
        (0.0, 0.1, 20.0, NotApplicableReason::PeInvalid),
        (30.0, 0.0, 20.0, NotApplicableReason::NonPositiveGrowth),
        (30.0, f64::INFINITY, 20.0, NotApplicableReason::NonPositiveGrowth),
        (30.0, 0.1, 0.0, NotApplicableReason::TargetPeInvalid),
        (30.0, 0.1, -5.0, NotApplicableReason::TargetPeInvalid),
    ];

    for (pe, growth, target, reason) in cases {
        assert_eq!(
            diagnose(pe, growth, target),
            DiagnosisResult::NotApplicable { reason },
            "pe={pe} growth={growth} target={target}"
        );
    }
}

#[test]
fn higher_pe_takes_longer() {
    let mut previous = 0.0;
    for pe in [21.0, 25.0, 30.0, 45.0, 80.0, 200.0] {
        let current = years(pe, 0.12, 20.0);
        assert!(current > previous, "pe={pe}: {current} <= {previous}");
        previous = current;
    }
}

#[test]
fn faster_growth_regresses_sooner() {
    let mut previous = f64::INFINITY;
    for growth in [0.02, 0.05, 0.10, 0.20, 0.50, 1.0] {
        let current = years(40.0, growth, 20.0);
        assert!(current < previous, "growth={growth}: {current} >= {previous}");
        previous = current;
    }
}

#[test]
fn same_inputs_same_answer() {
    let first = diagnose(33.3, 0.137, 18.0);
    for _ in 0..10 {
        assert_eq!(diagnose(33.3, 0.137, 18.0), first);
    }
}

#[test]
fn doubling_pe_at_doubling_growth_takes_one_year() {
    let years = years(40.0, 1.0, 20.0);
    assert!((years - 1.0).abs() < 1e-12);
}

#[test]
fn analysis_carries_record_inputs_and_band() {
    let record = QuoteRecord::new(
        Ticker::parse("AAPL").expect("valid ticker"),
        ProviderId::Yahoo,
        Some(String::from("Apple Inc.")),
        190.0,
        "USD",
        Sourced::observed(60.0, ValueOrigin::TrailingPe),
        Sourced::observed(0.10, ValueOrigin::ReportedGrowth),
        None,
    )
    .expect("valid record");

    let analysis = analyze(&record, 20.0);

    assert_eq!(analysis.current_pe, 60.0);
    assert_eq!(analysis.growth_rate, 0.10);
    assert_eq!(analysis.band, Some(ValuationBand::Overheated));
    assert!(analysis.warnings.is_empty());
    assert!((analysis.diagnosis.years().unwrap_or_default() - 11.527).abs() < 0.01);
}
