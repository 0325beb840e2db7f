// End-to-end pipeline: CSV extracts in, reconciled ledger and formatted
// workbook out, exercising the same path `spendgrid run` wires together.

use std::io::Write;
use std::path::Path;

use spendgrid_recon::{RuleConfig, RunInput};

fn write_csv(path: &Path, lines: &[&str]) {
    let mut file = std::fs::File::create(path).unwrap();
    for line in lines {
        writeln!(file, "{line}").unwrap();
    }
}

fn billed_lines() -> Vec<&'static str> {
    vec![
        "PO,CampaignName,MediaName,ProductName,ClientCode,BuyMonth,Payable,AgencyCommission,LevyBillable,UnbilledClientCost,InvoiceNo,Division",
        "PO-100,CHANEL_UK_BLEUH1_SOCIAL_2024,SEARCH&SOC,BLEU,C50,January,100.00,10.00,1.00,111.00,INV-1,F&B",
        "PO-100,CHANEL_UK_BLEUH1_SOCIAL_2024,SEARCH&SOC,BLEU,C50,January,200.00,20.00,2.00,222.00,INV-2,F&B",
        "PO-200,CHANEL_UK_EYEWEAR_DISPLAY_2024,DISPLAY,EYEWEAR,C51,February,50.00,5.00,0.50,55.50,INV-3,FSH&EW",
    ]
}

fn unbilled_lines() -> Vec<&'static str> {
    vec![
        "PO,CampaignName,MediaName,ProductName,ClientCode,BuyMonth,Payable,AgencyCommission,LevyBillable,UnbilledClientCost,InvoiceNo,Division",
        "PO-900,CHANEL F&B FEES 2024,FEES,FEES,C50,March,30.00,3.00,0.30,33.30,,F&B",
    ]
}

fn budget_lines() -> Vec<&'static str> {
    vec![
        "Campaign,Market,Planned Spend latest plan,Reserve,GRAND TOTAL inc reserve",
        "Bleu H1,UK,1000.00,100.00,1100.00",
        "Eyewear,UK,500.00,50.00,550.00",
    ]
}

fn load_input(dir: &Path) -> RunInput {
    let billed = dir.join("billed.csv");
    let unbilled = dir.join("unbilled.csv");
    let budget = dir.join("budget_tracker.csv");
    write_csv(&billed, &billed_lines());
    write_csv(&unbilled, &unbilled_lines());
    write_csv(&budget, &budget_lines());

    RunInput {
        billed: spendgrid_io::read_table(&billed, "billed").unwrap(),
        unbilled: spendgrid_io::read_table(&unbilled, "unbilled").unwrap(),
        budget: spendgrid_io::read_table(&budget, "budget_tracker").unwrap(),
        annual_forecast: Some(5_000_000_00),
    }
}

#[test]
fn csv_to_workbook_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let input = load_input(dir.path());

    let result = spendgrid_recon::run(&RuleConfig::default(), &input).unwrap();
    assert_eq!(result.summary.spend_rows, 4);
    assert_eq!(result.summary.budget_rows, 2);
    assert!(result.summary.budget_matched >= 2, "Bleu H1 and Eyewear totals join");

    let book = spendgrid_report::synthesize(&result);
    let names: Vec<&str> = book.sheets.iter().map(|s| s.name.as_str()).collect();
    assert!(names.contains(&"F&B"));
    assert!(names.contains(&"FSH&EW"));
    assert!(names.contains(&"F&B Monthly"));

    let out = dir.path().join("report.xlsx");
    let stats = spendgrid_io::write_report(&book, &out).unwrap();
    assert_eq!(stats.sheets_written, book.sheets.len());
    assert!(std::fs::metadata(&out).unwrap().len() > 0);

    let ledger = dir.path().join("ledger.csv");
    spendgrid_io::write_ledger_csv(&result.ledger, &ledger).unwrap();
    let text = std::fs::read_to_string(&ledger).unwrap();
    // Detail rows plus one total per PO, plus the header line.
    assert_eq!(text.lines().count(), 1 + result.ledger.len());
    assert!(text.contains("Bleu H1"));
    assert!(text.contains("Total"));
}

#[test]
fn joined_totals_carry_budget_derived_measures() {
    let dir = tempfile::tempdir().unwrap();
    let input = load_input(dir.path());
    let result = spendgrid_recon::run(&RuleConfig::default(), &input).unwrap();

    let total = result
        .ledger
        .iter()
        .find(|r| r.is_total && r.campaign_key.as_deref() == Some("Bleu H1"))
        .unwrap();
    let budget = total.budget.expect("total rows attempt the join");
    assert_eq!(budget.total_budget, Some(110000));
    // commission 30.00 + levy 3.00 + budget 1100.00
    assert_eq!(budget.total_po_value, Some(113300));
    // minus invoiced 333.00
    assert_eq!(budget.po_value_remaining, Some(80000));

    for row in result.ledger.iter().filter(|r| !r.is_total) {
        assert!(row.budget.is_none());
    }
}

#[test]
fn custom_config_overrides_column_names() {
    let dir = tempfile::tempdir().unwrap();
    let billed = dir.path().join("billed.csv");
    write_csv(
        &billed,
        &[
            "PurchaseOrder,CampaignName,MediaName,ProductName,ClientCode,BuyMonth,Payable,AgencyCommission,LevyBillable,UnbilledClientCost",
            "PO-1,CHANEL_UK_BLEUH1_SOCIAL_2024,PRESS,BLEU,C50,4,10.00,1.00,0.10,11.10",
        ],
    );
    let config = RuleConfig::from_toml(
        r#"
[spend_columns]
po_number = "PurchaseOrder"
"#,
    )
    .unwrap();

    let table = spendgrid_io::read_table(&billed, "billed").unwrap();
    let records = spendgrid_recon::ingest::spend_records(&table, &config).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].po_number, "PO-1");
}
