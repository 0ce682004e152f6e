use sqlite_rust::executor;
use sqlite_rust::page::Pager;
use sqlite_rust::schema::{Catalog, DatabaseHeader};
use sqlite_rust::sql;

fn fixture_path(filename: &str) -> String {
    std::env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set")
        + "/tests/fixtures/"
        + filename
}

fn open(filename: &str) -> (Pager, Catalog) {
    let path = fixture_path(filename);
    let header = DatabaseHeader::read(&path).expect("should read database header");
    let pager = Pager::open_with_reserved(&path, header.page_size, header.reserved_bytes_per_page)
        .expect("should open pager");
    let catalog = Catalog::build(&pager).expect("should build catalog");
    (pager, catalog)
}

fn query(pager: &Pager, catalog: &Catalog, sql_text: &str) -> Vec<String> {
    let plan = sql::parse_select(sql_text).expect("should parse select");
    executor::execute(pager, catalog, &plan).expect("should execute query")
}

#[test]
fn dbinfo_reports_table_count() {
    let (_pager, catalog) = open("sample.db");
    assert_eq!(catalog.count_tables(), 2);
}

#[test]
fn tables_lists_user_tables_in_catalog_order() {
    let (_pager, catalog) = open("sample.db");
    assert_eq!(catalog.list_tables(), vec!["apples", "oranges"]);
}

#[test]
fn count_star_on_apples() {
    let (pager, catalog) = open("sample.db");
    let out = query(&pager, &catalog, "SELECT COUNT(*) FROM apples");
    assert_eq!(out, vec!["4"]);
}

#[test]
fn single_column_projection_in_rowid_order() {
    let (pager, catalog) = open("sample.db");
    let out = query(&pager, &catalog, "SELECT name FROM apples");
    assert_eq!(
        out,
        vec!["Granny Smith", "Fuji", "Golden Delicious", "Bramley"]
    );
}

#[test]
fn where_equality_on_non_indexed_column() {
    let (pager, catalog) = open("sample.db");
    let out = query(
        &pager,
        &catalog,
        "SELECT id, name FROM apples WHERE color = 'Yellow'",
    );
    assert_eq!(out, vec!["3|Golden Delicious"]);
}

#[test]
fn where_equality_on_rowid_alias() {
    let (pager, catalog) = open("sample.db");
    let out = query(&pager, &catalog, "SELECT name FROM apples WHERE id = 2");
    assert_eq!(out, vec!["Fuji"]);
}

#[test]
fn where_equality_on_rowid_alias_with_quoted_literal() {
    let (pager, catalog) = open("sample.db");
    let out = query(&pager, &catalog, "SELECT name FROM apples WHERE id = '2'");
    assert_eq!(out, vec!["Fuji"]);
}

#[test]
fn where_equality_on_text_column_with_bare_integer_literal() {
    let (pager, catalog) = open("sample.db");
    // "color" never equals a bare digit string, but the predicate must
    // still be evaluated as a byte comparison rather than rejected.
    let out = query(&pager, &catalog, "SELECT name FROM apples WHERE color = 5");
    assert!(out.is_empty());
}

#[test]
fn index_driven_query_returns_same_rows_as_full_scan_and_touches_fewer_pages() {
    let (pager, catalog) = open("companies.db");

    let indexed = query(
        &pager,
        &catalog,
        "SELECT name, country FROM companies WHERE country = 'myanmar'",
    );
    let pages_after_index = pager.pages_read();

    let mut expected: Vec<String> = (1..=200)
        .filter(|id| [17, 42, 99, 150, 183].contains(id))
        .map(|id| format!("Company {id}|myanmar"))
        .collect();
    expected.sort();
    let mut actual = indexed.clone();
    actual.sort();
    assert_eq!(actual, expected);

    let (full_scan_pager, full_scan_catalog) = open("companies.db");
    let _ = query(
        &full_scan_pager,
        &full_scan_catalog,
        "SELECT name, country FROM companies",
    );
    let pages_for_full_scan = full_scan_pager.pages_read();

    assert!(
        pages_after_index < pages_for_full_scan,
        "index path read {pages_after_index} pages, full scan read {pages_for_full_scan}"
    );
}
