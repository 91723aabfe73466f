//! Documents submitted through the rate-limited client.
//!
//! A [`Document`] pairs a product group and document type with the caller's payload; its
//! [`payload`](Document::payload) is the JSON body the submission endpoint expects.

use serde::Serialize;

/// Kind of document being registered.
///
/// Serialized as the upstream identifiers, e.g. `LP_INTRODUCE_GOODS_CSV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
    AggregationDocument,
    AggregationDocumentCsv,
    AggregationDocumentXml,
    DisaggregationDocument,
    DisaggregationDocumentCsv,
    DisaggregationDocumentXml,
    ReaggregationDocument,
    ReaggregationDocumentCsv,
    ReaggregationDocumentXml,
    LpIntroduceGoods,
    LpShipGoods,
    LpShipGoodsCsv,
    LpShipGoodsXml,
    LpIntroduceGoodsCsv,
    LpIntroduceGoodsXml,
    LpAcceptGoods,
    LpAcceptGoodsXml,
    LkRemark,
    LkRemarkCsv,
    LkRemarkXml,
    LkReceipt,
    LkReceiptXml,
    LkReceiptCsv,
    LpGoodsImport,
    LpGoodsImportCsv,
    LpGoodsImportXml,
    LpCancelShipment,
    LpCancelShipmentCsv,
    LpCancelShipmentXml,
    LkKmCancellation,
    LkKmCancellationCsv,
    LkKmCancellationXml,
    LkAppliedKmCancellation,
    LkAppliedKmCancellationCsv,
    LkAppliedKmCancellationXml,
    LkContractCommissioning,
    LkContractCommissioningCsv,
    LkContractCommissioningXml,
    LkIndiCommissioning,
    LkIndiCommissioningCsv,
    LkIndiCommissioningXml,
    LpShipReceipt,
    LpShipReceiptCsv,
    LpShipReceiptXml,
    OstDescription,
    OstDescriptionCsv,
    OstDescriptionXml,
    Crossborder,
    CrossborderCsv,
    CrossborderXml,
    LpIntroduceOst,
    LpIntroduceOstCsv,
    LpIntroduceOstXml,
    LpReturn,
    LpReturnCsv,
    LpReturnXml,
    LpShipGoodsCrossborder,
    LpShipGoodsCrossborderCsv,
    LpShipGoodsCrossborderXml,
    LpCancelShipmentCrossborder,
}

/// Encoding of the embedded product document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DocumentFormat {
    Manual,
    Xml,
    Csv,
}

/// Commodity group a document belongs to.
///
/// The name selects the endpoint (`?pg=<name>`); the numeric code goes in the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProductGroup {
    name: &'static str,
    code: u8,
}

impl ProductGroup {
    pub const CLOTHES: Self = Self { name: "clothes", code: 1 };
    pub const SHOES: Self = Self { name: "shoes", code: 2 };
    pub const TOBACCO: Self = Self { name: "tobacco", code: 3 };
    pub const PERFUMERY: Self = Self { name: "perfumery", code: 4 };
    pub const TIRES: Self = Self { name: "tires", code: 5 };
    pub const ELECTRONICS: Self = Self { name: "electronics", code: 6 };
    pub const PHARMA: Self = Self { name: "pharma", code: 7 };
    pub const MILK: Self = Self { name: "milk", code: 8 };
    pub const BICYCLE: Self = Self { name: "bicycle", code: 9 };
    pub const WHEELCHAIRS: Self = Self { name: "wheelchairs", code: 10 };

    /// Every known group, ordered by code.
    pub const ALL: [Self; 10] = [
        Self::CLOTHES,
        Self::SHOES,
        Self::TOBACCO,
        Self::PERFUMERY,
        Self::TIRES,
        Self::ELECTRONICS,
        Self::PHARMA,
        Self::MILK,
        Self::BICYCLE,
        Self::WHEELCHAIRS,
    ];

    /// Look a group up by its numeric code.
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.code == code)
    }

    /// Look a group up by its endpoint name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.name == name)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn code(&self) -> u8 {
        self.code
    }
}

/// A document ready for submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    product_group: ProductGroup,
    format: DocumentFormat,
    product_document: String,
    document_type: DocumentType,
}

impl Document {
    pub fn new(
        product_group: ProductGroup,
        format: DocumentFormat,
        product_document: impl Into<String>,
        document_type: DocumentType,
    ) -> Self {
        Self { product_group, format, product_document: product_document.into(), document_type }
    }

    pub fn product_group(&self) -> ProductGroup {
        self.product_group
    }

    pub fn format(&self) -> DocumentFormat {
        self.format
    }

    pub fn document_type(&self) -> DocumentType {
        self.document_type
    }

    pub fn product_document(&self) -> &str {
        &self.product_document
    }

    /// Request body for this document, signed with `signature`.
    pub fn payload<'a>(&'a self, signature: &'a str) -> DocumentPayload<'a> {
        DocumentPayload {
            document_format: self.format,
            product_document: &self.product_document,
            product_group: self.product_group.code,
            document_type: self.document_type,
            signature,
        }
    }
}

/// Wire shape of a document submission.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentPayload<'a> {
    pub document_format: DocumentFormat,
    pub product_document: &'a str,
    pub product_group: u8,
    #[serde(rename = "type")]
    pub document_type: DocumentType,
    pub signature: &'a str,
}
