//! Table catalog and collection-export request envelopes.
//!
//! The engine exposes ten entity types for bulk export. Each table carries
//! its own FETCH field list, so request bodies are generated per table
//! rather than from one generic template.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;

use super::TallyError;

/// An exportable entity type in the accounting engine.
///
/// Table names from external text (config, CLI) enter through `FromStr`;
/// everywhere else the variant itself is passed around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKind {
    Ledgers,
    Groups,
    Vouchers,
    StockItems,
    StockGroups,
    Units,
    CostCentres,
    Godowns,
    Currencies,
    VoucherTypes,
}

impl TableKind {
    /// Every table, in catalog order.
    pub const ALL: [TableKind; 10] = [
        TableKind::Ledgers,
        TableKind::Groups,
        TableKind::Vouchers,
        TableKind::StockItems,
        TableKind::StockGroups,
        TableKind::Units,
        TableKind::CostCentres,
        TableKind::Godowns,
        TableKind::Currencies,
        TableKind::VoucherTypes,
    ];

    /// Catalog name, also used as the collection ID in requests and as the
    /// export file stem.
    pub fn name(&self) -> &'static str {
        match self {
            TableKind::Ledgers => "Ledgers",
            TableKind::Groups => "Groups",
            TableKind::Vouchers => "Vouchers",
            TableKind::StockItems => "StockItems",
            TableKind::StockGroups => "StockGroups",
            TableKind::Units => "Units",
            TableKind::CostCentres => "CostCentres",
            TableKind::Godowns => "Godowns",
            TableKind::Currencies => "Currencies",
            TableKind::VoucherTypes => "VoucherTypes",
        }
    }

    /// Human-readable description for status listings.
    pub fn description(&self) -> &'static str {
        match self {
            TableKind::Ledgers => "Chart of Accounts - Ledgers",
            TableKind::Groups => "Ledger Groups",
            TableKind::Vouchers => "All Vouchers/Transactions",
            TableKind::StockItems => "Inventory Items",
            TableKind::StockGroups => "Stock Groups",
            TableKind::Units => "Units of Measure",
            TableKind::CostCentres => "Cost Centers",
            TableKind::Godowns => "Warehouses/Godowns",
            TableKind::Currencies => "Currency Masters",
            TableKind::VoucherTypes => "Voucher Type Masters",
        }
    }

    /// The engine-side entity tag: declared as `<TYPE>` in requests, and the
    /// element name the engine wraps each result record in.
    pub fn collection_type(&self) -> &'static str {
        match self {
            TableKind::Ledgers => "Ledger",
            TableKind::Groups => "Group",
            TableKind::Vouchers => "Voucher",
            TableKind::StockItems => "StockItem",
            TableKind::StockGroups => "StockGroup",
            TableKind::Units => "Unit",
            TableKind::CostCentres => "CostCentre",
            TableKind::Godowns => "Godown",
            TableKind::Currencies => "Currency",
            TableKind::VoucherTypes => "VoucherType",
        }
    }

    /// The per-entity field list fetched in the export.
    fn fetch_list(&self) -> &'static str {
        match self {
            TableKind::Ledgers => {
                "NAME, PARENT, OPENINGBALANCE, CLOSINGBALANCE, GUID, ALTERID, LEDGERPHONE, \
                 LEDGEREMAIL, LEDGERCONTACT, COUNTRYNAME, STATENAME, PINCODE, \
                 GSTREGISTRATIONTYPE, PARTYGSTIN, ADDRESS.LIST"
            }
            TableKind::Groups => "NAME, PARENT, PRIMARYGROUP, ISSUBLEDGER, ISADDABLE, GUID, ALTERID",
            TableKind::Vouchers => {
                "DATE, VOUCHERTYPENAME, VOUCHERNUMBER, REFERENCE, REFERENCEDATE, NARRATION, \
                 PARTYLEDGERNAME, AMOUNT, GUID, ALTERID, ALLLEDGERENTRIES.LIST"
            }
            TableKind::StockItems => {
                "NAME, PARENT, CATEGORY, BASEUNITS, OPENINGBALANCE, CLOSINGBALANCE, \
                 OPENINGVALUE, CLOSINGVALUE, GUID, ALTERID, GSTAPPLICABLE, HSNCODE, \
                 GSTDETAILS.LIST"
            }
            TableKind::StockGroups => "NAME, PARENT, GUID, ALTERID",
            TableKind::Units => "NAME, FORMALNAME, ISSIMPLEUNIT, GUID, ALTERID",
            TableKind::CostCentres => "NAME, PARENT, GUID, ALTERID",
            TableKind::Godowns => "NAME, PARENT, GUID, ALTERID",
            TableKind::Currencies => "NAME, SYMBOL, GUID, ALTERID",
            TableKind::VoucherTypes => "NAME, PARENT, NUMBERINGMETHOD, GUID, ALTERID",
        }
    }

    /// Extra attributes on the `<COLLECTION>` element. The Ledgers export
    /// pins down the collection definition so an engine-side customisation
    /// of the same name cannot shadow it.
    fn collection_attrs(&self) -> &'static str {
        match self {
            TableKind::Ledgers => {
                " ISMODIFY='No' ISFIXED='No' ISINITIALIZE='No' ISOPTION='No' ISINTERNAL='No'"
            }
            _ => "",
        }
    }

    /// Builds the collection-export envelope for this table.
    ///
    /// The date pair is all-or-nothing: both dates present injects
    /// `SVFROMDATE`/`SVTODATE` (as `yyyyMMdd`), one date alone injects
    /// neither. Vouchers are the one entity whose engine collection ignores
    /// the date static-variables, so a dated Vouchers request additionally
    /// gets an explicit `FILTER` over the same variables.
    pub fn request_body(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        company: Option<&str>,
    ) -> String {
        let date_range = match (from, to) {
            (Some(from), Some(to)) => Some((from, to)),
            _ => None,
        };

        let mut static_vars = String::from("        <SVEXPORTFORMAT>$$SysName:XML</SVEXPORTFORMAT>\n");
        if let Some(company) = company {
            static_vars.push_str(&format!(
                "        <SVCURRENTCOMPANY>{}</SVCURRENTCOMPANY>\n",
                company
            ));
        }
        if let Some((from, to)) = date_range {
            static_vars.push_str(&format!(
                "        <SVFROMDATE>{}</SVFROMDATE>\n        <SVTODATE>{}</SVTODATE>\n",
                from.format("%Y%m%d"),
                to.format("%Y%m%d")
            ));
        }

        let mut filter = "";
        let mut formula = "";
        if *self == TableKind::Vouchers && date_range.is_some() {
            filter = "\n            <FILTER>DateFilter</FILTER>";
            formula = "\n          <SYSTEM TYPE='Formulae' NAME='DateFilter'>\
                       $$IsSysNameEqual:VoucherDate:##SVFROMDATE:##SVTODATE</SYSTEM>";
        }

        format!(
            r"<ENVELOPE>
  <HEADER>
    <VERSION>1</VERSION>
    <TALLYREQUEST>Export</TALLYREQUEST>
    <TYPE>Collection</TYPE>
    <ID>{name}</ID>
  </HEADER>
  <BODY>
    <DESC>
      <STATICVARIABLES>
{static_vars}      </STATICVARIABLES>
      <TDL>
        <TDLMESSAGE>
          <COLLECTION NAME='{name}'{attrs}>
            <TYPE>{collection_type}</TYPE>
            <FETCH>{fetch}</FETCH>{filter}
          </COLLECTION>{formula}
        </TDLMESSAGE>
      </TDL>
    </DESC>
  </BODY>
</ENVELOPE>",
            name = self.name(),
            static_vars = static_vars,
            attrs = self.collection_attrs(),
            collection_type = self.collection_type(),
            fetch = self.fetch_list(),
            filter = filter,
            formula = formula,
        )
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for TableKind {
    type Err = TallyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TableKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| TallyError::UnknownTable(s.to_string()))
    }
}
