//! IRIs of the canonical graph encoding.

use oxigraph::model::NamedNode;

pub fn node(iri: &str) -> NamedNode {
    NamedNode::new_unchecked(iri)
}

/// Stream and window extension vocabulary.
pub mod rsp {
    pub const NS: &str = "http://w3id.org/rsp/spin#";

    pub const LOGICAL_WINDOW: &str = "http://w3id.org/rsp/spin#LogicalWindow";
    pub const LOGICAL_PAST_WINDOW: &str = "http://w3id.org/rsp/spin#LogicalPastWindow";
    pub const PHYSICAL_WINDOW: &str = "http://w3id.org/rsp/spin#PhysicalWindow";
    pub const ISTREAM: &str = "http://w3id.org/rsp/spin#Istream";
    pub const DSTREAM: &str = "http://w3id.org/rsp/spin#Dstream";
    pub const RSTREAM: &str = "http://w3id.org/rsp/spin#Rstream";

    pub const FROM_NAMED_WINDOW: &str = "http://w3id.org/rsp/spin#fromNamedWindow";
    pub const WINDOW_URI: &str = "http://w3id.org/rsp/spin#windowUri";
    pub const STREAM_URI: &str = "http://w3id.org/rsp/spin#streamUri";
    pub const LOGICAL_RANGE: &str = "http://w3id.org/rsp/spin#logicalRange";
    pub const LOGICAL_STEP: &str = "http://w3id.org/rsp/spin#logicalStep";
    pub const FROM: &str = "http://w3id.org/rsp/spin#from";
    pub const TO: &str = "http://w3id.org/rsp/spin#to";
    pub const PHYSICAL_RANGE: &str = "http://w3id.org/rsp/spin#physicalRange";
    pub const PHYSICAL_STEP: &str = "http://w3id.org/rsp/spin#physicalStep";
    pub const HAS_OUTPUT_STREAM: &str = "http://w3id.org/rsp/spin#hasOutputStream";
    pub const HAS_OUTPUT_STREAM_OPERATOR: &str = "http://w3id.org/rsp/spin#hasOutputStreamOperator";
    pub const VARIABLE: &str = "http://w3id.org/rsp/spin#variable";
}

/// SPIN query vocabulary.
pub mod sp {
    pub const NS: &str = "http://spinrdf.org/sp#";

    pub const SELECT: &str = "http://spinrdf.org/sp#Select";
    pub const CONSTRUCT: &str = "http://spinrdf.org/sp#Construct";
    pub const ASK: &str = "http://spinrdf.org/sp#Ask";
    pub const DESCRIBE: &str = "http://spinrdf.org/sp#Describe";
    pub const VARIABLE: &str = "http://spinrdf.org/sp#Variable";

    pub const TEXT: &str = "http://spinrdf.org/sp#text";
    pub const WHERE: &str = "http://spinrdf.org/sp#where";
    pub const RESULT_VARIABLES: &str = "http://spinrdf.org/sp#resultVariables";
    pub const VAR_NAME: &str = "http://spinrdf.org/sp#varName";
}

/// SPIN modules.
pub mod spin {
    pub const NS: &str = "http://spinrdf.org/spin#";

    pub const TEMPLATE: &str = "http://spinrdf.org/spin#Template";
    pub const SELECT_TEMPLATE: &str = "http://spinrdf.org/spin#SelectTemplate";
    pub const CONSTRUCT_TEMPLATE: &str = "http://spinrdf.org/spin#ConstructTemplate";
    pub const ASK_TEMPLATE: &str = "http://spinrdf.org/spin#AskTemplate";
    pub const DESCRIBE_TEMPLATE: &str = "http://spinrdf.org/spin#DescribeTemplate";
    pub const BODY: &str = "http://spinrdf.org/spin#body";
    pub const CONSTRAINT: &str = "http://spinrdf.org/spin#constraint";
}

/// SPIN standard library (argument declarations).
pub mod spl {
    pub const NS: &str = "http://spinrdf.org/spl#";

    pub const ARGUMENT: &str = "http://spinrdf.org/spl#Argument";
    pub const PREDICATE: &str = "http://spinrdf.org/spl#predicate";
    pub const VALUE_TYPE: &str = "http://spinrdf.org/spl#valueType";
    pub const DEFAULT_VALUE: &str = "http://spinrdf.org/spl#defaultValue";
    pub const OPTIONAL: &str = "http://spinrdf.org/spl#optional";
}

pub mod arg {
    pub const NS: &str = "http://spinrdf.org/arg#";
}

pub mod rdf {
    pub const NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
    pub const TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
    pub const LANG_STRING: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#langString";
}

pub mod rdfs {
    pub const NS: &str = "http://www.w3.org/2000/01/rdf-schema#";
    pub const RESOURCE: &str = "http://www.w3.org/2000/01/rdf-schema#Resource";
    pub const LITERAL: &str = "http://www.w3.org/2000/01/rdf-schema#Literal";
    pub const LABEL: &str = "http://www.w3.org/2000/01/rdf-schema#label";
    pub const COMMENT: &str = "http://www.w3.org/2000/01/rdf-schema#comment";
    pub const SUB_CLASS_OF: &str = "http://www.w3.org/2000/01/rdf-schema#subClassOf";
    pub const SUB_PROPERTY_OF: &str = "http://www.w3.org/2000/01/rdf-schema#subPropertyOf";
}

pub mod xsd {
    pub const NS: &str = "http://www.w3.org/2001/XMLSchema#";
    pub const STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
    pub const BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
    pub const INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
    pub const DECIMAL: &str = "http://www.w3.org/2001/XMLSchema#decimal";
    pub const DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";
    pub const FLOAT: &str = "http://www.w3.org/2001/XMLSchema#float";
    pub const DURATION: &str = "http://www.w3.org/2001/XMLSchema#duration";
    pub const DATE_TIME: &str = "http://www.w3.org/2001/XMLSchema#dateTime";
    pub const DATE: &str = "http://www.w3.org/2001/XMLSchema#date";
    pub const ANY_URI: &str = "http://www.w3.org/2001/XMLSchema#anyURI";
}
