//! End-to-end workbook translation against a generated `.xlsx`.

use pptrans_core::{
    output_path, EditorSession, Error, FragmentFilter, Result, SkipReason, TranslationJob,
    Translator,
};
use pptrans_opc::Package;
use pptrans_xlsx::sheet::{scan_column, ScanRange};
use pptrans_xlsx::shared_strings::parse_shared_strings;
use pptrans_xlsx::Workbook;
use std::cell::RefCell;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use zip::write::FileOptions;
use zip::ZipWriter;

const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";

fn write_workbook(dir: &Path, name: &str) -> PathBuf {
    let shared = ["Text", "Hello world", "#goto 2", "@pause", "~wait", "Overview", "Goodbye"];
    let sst = format!(
        r#"<sst xmlns="{MAIN_NS}" count="{n}" uniqueCount="{n}">{}</sst>"#,
        shared.iter().map(|s| format!("<si><t>{}</t></si>", s)).collect::<String>(),
        n = shared.len()
    );

    // B2..B8, with a gap at B6 that must not end the scan.
    let slide_sheet = format!(
        r#"<worksheet xmlns="{MAIN_NS}"><dimension ref="A1:B8"/><sheetData><row r="1"><c r="B1" t="s"><v>0</v></c></row><row r="2"><c r="A2"><v>1</v></c><c r="B2" t="s" s="1"><v>1</v></c></row><row r="3"><c r="B3" t="s"><v>2</v></c></row><row r="4"><c r="B4" t="s"><v>3</v></c></row><row r="5"><c r="B5" t="s"><v>4</v></c></row><row r="7"><c r="B7"><v>3.5</v></c></row><row r="8"><c r="B8" t="s"><v>6</v></c></row></sheetData></worksheet>"#
    );
    let other_sheet = format!(
        r#"<worksheet xmlns="{MAIN_NS}"><dimension ref="A1:B2"/><sheetData><row r="2"><c r="B2" t="s"><v>5</v></c></row></sheetData></worksheet>"#
    );

    let parts = [
        (
            "_rels/.rels".to_string(),
            format!(r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="{REL_NS}/officeDocument" Target="xl/workbook.xml"/></Relationships>"#),
        ),
        (
            "xl/workbook.xml".to_string(),
            format!(r#"<workbook xmlns="{MAIN_NS}" xmlns:r="{REL_NS}"><sheets><sheet name="Overview" sheetId="1" r:id="rId1"/><sheet name="slide1" sheetId="2" r:id="rId2"/></sheets></workbook>"#),
        ),
        (
            "xl/_rels/workbook.xml.rels".to_string(),
            format!(r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="{REL_NS}/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="{REL_NS}/worksheet" Target="worksheets/sheet2.xml"/><Relationship Id="rId3" Type="{REL_NS}/sharedStrings" Target="sharedStrings.xml"/></Relationships>"#),
        ),
        ("xl/sharedStrings.xml".to_string(), sst),
        ("xl/worksheets/sheet1.xml".to_string(), other_sheet),
        ("xl/worksheets/sheet2.xml".to_string(), slide_sheet),
    ];

    let path = dir.join(name);
    let mut writer = ZipWriter::new(fs::File::create(&path).unwrap());
    for (name, content) in &parts {
        writer.start_file(name.as_str(), FileOptions::default()).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap();
    path
}

#[derive(Default)]
struct FakeTranslator {
    calls: RefCell<Vec<String>>,
    fail: bool,
}

impl Translator for FakeTranslator {
    fn translate(&self, text: &str, target: &str, source: &str) -> Result<String> {
        if self.fail {
            return Err(Error::TranslationError("network down".to_string()));
        }
        self.calls.borrow_mut().push(format!("{}>{}:{}", source, target, text));
        Ok(text.to_uppercase())
    }
}

fn cells(package: &mut Package, part: &str) -> Vec<(String, String)> {
    let shared = parse_shared_strings(&package.read_part("xl/sharedStrings.xml").unwrap()).unwrap();
    let xml = package.read_part(part).unwrap();
    scan_column(&xml, &shared, ScanRange { column: 2, first_row: 2 })
        .unwrap()
        .into_iter()
        .map(|c| (c.reference, c.text))
        .collect()
}

#[test]
fn test_translates_slide_sheets_only() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_workbook(dir.path(), "steps.xlsx");
    let original = fs::read(&input).unwrap();

    let translator = FakeTranslator::default();
    let filter = FragmentFilter::new();
    let job = TranslationJob::new(&translator, &filter, "ja");

    let workbook = Workbook::open(&input).unwrap();
    let names: Vec<&str> = workbook.sheets().iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Overview", "slide1"]);

    let mut session = EditorSession::new(workbook);
    let report = job.run(session.document_mut().unwrap()).unwrap();
    let output = output_path(&input, "ja").unwrap();
    session.finish(&output).unwrap();

    assert_eq!(*translator.calls.borrow(), vec!["en>ja:Hello world", "en>ja:Goodbye"]);
    assert_eq!(report.translated, 2);
    assert_eq!(report.skipped[&SkipReason::ControlMarker], 3);

    assert_eq!(output, dir.path().join("steps.ja.xlsx"));
    let mut package = Package::open(&output).unwrap();
    assert_eq!(
        cells(&mut package, "xl/worksheets/sheet2.xml"),
        vec![
            ("B2".to_string(), "HELLO WORLD".to_string()),
            ("B3".to_string(), "#goto 2".to_string()),
            ("B4".to_string(), "@pause".to_string()),
            ("B5".to_string(), "~wait".to_string()),
            ("B8".to_string(), "GOODBYE".to_string()),
        ]
    );

    // Style kept, numeric cell untouched, other sheet untouched.
    let sheet = package.read_part("xl/worksheets/sheet2.xml").unwrap();
    assert!(sheet.contains(r#"<c r="B2" s="1" t="inlineStr">"#));
    assert!(sheet.contains(r#"<c r="B7"><v>3.5</v></c>"#));
    assert_eq!(
        cells(&mut package, "xl/worksheets/sheet1.xml"),
        vec![("B2".to_string(), "Overview".to_string())]
    );

    assert_eq!(fs::read(&input).unwrap(), original);
}

#[test]
fn test_uppercase_extension_is_kept() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_workbook(dir.path(), "Steps.XLSX");

    let translator = FakeTranslator::default();
    let filter = FragmentFilter::new();
    let job = TranslationJob::new(&translator, &filter, "pt-BR");

    let mut session = EditorSession::new(Workbook::open(&input).unwrap());
    job.run(session.document_mut().unwrap()).unwrap();
    let output = output_path(&input, "pt-BR").unwrap();
    session.finish(&output).unwrap();

    assert!(dir.path().join("Steps.pt-BR.XLSX").exists());
}

#[test]
fn test_failed_translation_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_workbook(dir.path(), "steps.xlsx");

    let translator = FakeTranslator {
        fail: true,
        ..Default::default()
    };
    let filter = FragmentFilter::new();
    let job = TranslationJob::new(&translator, &filter, "de");

    let result = {
        let mut session = EditorSession::new(Workbook::open(&input).unwrap());
        job.run(session.document_mut().unwrap())
    };

    assert!(matches!(result, Err(Error::TranslationError(_))));
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}
